//! Linear download-then-convert pipeline.
//!
//! One invocation processes exactly one URL: validate, check prerequisites,
//! resolve metadata, sanitize the title, fetch and convert, persist. Any
//! failure is terminal for the invocation; nothing is retried and no state
//! survives the run.

use crate::config::Config;
use crate::deps;
use crate::downloader::{DownloadOptions, Downloader, VideoMetadata};
use crate::error::{DownloadError, YtMp3Error};
use crate::format::{AudioFormat, AudioQuality};
use crate::sanitize::{sanitize_filename, secure_path_join};
use crate::validate::{validate_output_dir, validate_url};

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Pipeline configuration for a single URL.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub url: String,
    pub output_dir: PathBuf,
    pub format: AudioFormat,
    pub quality: AudioQuality,
    pub max_filesize: u64,
    pub yt_dlp: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
}

impl PipelineConfig {
    /// Start from the loaded config; the CLI overlays its flags on top.
    pub fn from_config(config: &Config, url: String) -> Self {
        Self {
            url,
            output_dir: config.output.default_directory.clone(),
            format: config.output.default_format,
            quality: config.output.default_quality,
            max_filesize: config.max_filesize_bytes(),
            yt_dlp: config.paths.yt_dlp.clone(),
            ffmpeg: config.paths.ffmpeg.clone(),
        }
    }
}

/// Progress events emitted while the pipeline advances.
#[derive(Debug, Clone)]
pub enum PipelineStage {
    Validating,
    CheckingPrerequisites,
    Resolving,
    Downloading {
        title: String,
        downloaded: u64,
        total: Option<u64>,
    },
    Converting {
        format: AudioFormat,
    },
    Complete {
        output: PathBuf,
        size_bytes: u64,
        elapsed: Duration,
    },
    Failed {
        stage: &'static str,
        error: String,
    },
}

/// Result of a completed run; not retained beyond the process.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub output: PathBuf,
    pub title: String,
    pub size_bytes: u64,
    pub elapsed: Duration,
}

pub struct Pipeline {
    config: PipelineConfig,
    progress_tx: mpsc::Sender<PipelineStage>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, progress_tx: mpsc::Sender<PipelineStage>) -> Self {
        Self {
            config,
            progress_tx,
        }
    }

    pub async fn run(&self) -> Result<DownloadOutcome, YtMp3Error> {
        let started = Instant::now();

        // 1. Validate both inputs before touching anything else.
        self.send(PipelineStage::Validating).await;
        let url = validate_url(&self.config.url).map_err(|e| self.fail("validate", e))?;
        let dest =
            validate_output_dir(&self.config.output_dir).map_err(|e| self.fail("validate", e))?;

        // 2. Prerequisites, before any network activity.
        self.send(PipelineStage::CheckingPrerequisites).await;
        let yt_dlp = deps::check_yt_dlp(self.config.yt_dlp.as_deref())
            .await
            .map_err(|e| self.fail("prerequisites", e))?;
        let ffmpeg = deps::check_ffmpeg(self.config.ffmpeg.as_deref())
            .await
            .map_err(|e| self.fail("prerequisites", e))?;

        let downloader = Downloader::new(DownloadOptions {
            yt_dlp: yt_dlp.path,
            ffmpeg: ffmpeg.path,
            format: self.config.format,
            quality: self.config.quality,
            max_filesize: self.config.max_filesize,
        });

        // 3. Resolve metadata only; the stream is not transferred yet.
        self.send(PipelineStage::Resolving).await;
        let metadata = downloader
            .probe(&url)
            .await
            .map_err(|e| self.fail("resolve", e))?;
        self.reject_known_oversize(&metadata)?;

        // 4. Sanitize the remote title and pin down the final path.
        let stem = sanitize_filename(&metadata.title);
        let filename = format!("{stem}.{}", self.config.format.extension());
        let final_path =
            secure_path_join(dest.path(), &filename).map_err(|e| self.fail("sanitize", e))?;
        info!("writing to {}", final_path.display());

        // 5. Fetch and convert inside a scratch directory; partial files are
        // confined there and vanish with it on any failure.
        let scratch = tempfile::tempdir()?;
        let title = metadata.title.clone();
        let tx = self.progress_tx.clone();
        let format = self.config.format;
        let mut converting_announced = false;
        let mut on_progress = move |downloaded: u64, total: Option<u64>| {
            let _ = tx.try_send(PipelineStage::Downloading {
                title: title.clone(),
                downloaded,
                total,
            });
            // Transfer done means the converter hook takes over.
            if !converting_announced && total.is_some_and(|t| downloaded >= t) {
                converting_announced = true;
                let _ = tx.try_send(PipelineStage::Converting { format });
            }
        };

        let fetched = downloader
            .fetch_and_convert(&url, scratch.path(), &stem, &mut on_progress)
            .await
            .map_err(|e| self.fail("fetch", e))?;

        // 6. Move the finished file into the validated output directory.
        persist(&fetched.path, &final_path).await?;
        let elapsed = started.elapsed();
        info!(
            "done: {} ({} bytes, {:.1}s)",
            final_path.display(),
            fetched.size_bytes,
            elapsed.as_secs_f32()
        );

        self.send(PipelineStage::Complete {
            output: final_path.clone(),
            size_bytes: fetched.size_bytes,
            elapsed,
        })
        .await;

        Ok(DownloadOutcome {
            output: final_path,
            title: metadata.title,
            size_bytes: fetched.size_bytes,
            elapsed,
        })
    }

    /// An oversized download is rejected from metadata alone when the
    /// extractor already knows the size.
    fn reject_known_oversize(&self, metadata: &VideoMetadata) -> Result<(), YtMp3Error> {
        match metadata.filesize_approx {
            Some(approx) if approx > self.config.max_filesize => {
                let err = YtMp3Error::SizeLimitExceeded {
                    limit_mb: self.config.max_filesize / (1024 * 1024),
                };
                let _ = self.progress_tx.try_send(PipelineStage::Failed {
                    stage: "resolve",
                    error: err.to_string(),
                });
                Err(err)
            }
            _ => Ok(()),
        }
    }

    fn fail(&self, stage: &'static str, error: impl Into<YtMp3Error>) -> YtMp3Error {
        let error = error.into();
        let _ = self.progress_tx.try_send(PipelineStage::Failed {
            stage,
            error: error.to_string(),
        });
        error
    }

    async fn send(&self, stage: PipelineStage) {
        let _ = self.progress_tx.send(stage).await;
    }
}

/// Move the converted file to its final location, falling back to
/// copy-and-remove when the scratch directory sits on another filesystem.
async fn persist(from: &std::path::Path, to: &std::path::Path) -> Result<(), YtMp3Error> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(_) => {
            debug!("rename failed, copying across filesystems");
            tokio::fs::copy(from, to).await.map_err(DownloadError::Io)?;
            tokio::fs::remove_file(from).await.ok();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline_with(max_filesize: u64) -> (Pipeline, mpsc::Receiver<PipelineStage>) {
        let (tx, rx) = mpsc::channel(8);
        let config = PipelineConfig {
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
            output_dir: PathBuf::from("."),
            format: AudioFormat::Mp3,
            quality: AudioQuality::High,
            max_filesize,
            yt_dlp: None,
            ffmpeg: None,
        };
        (Pipeline::new(config, tx), rx)
    }

    fn metadata(filesize_approx: Option<u64>) -> VideoMetadata {
        serde_json::from_value(serde_json::json!({
            "id": "dQw4w9WgXcQ",
            "title": "Test Video",
            "filesize_approx": filesize_approx,
        }))
        .unwrap()
    }

    #[test]
    fn known_oversize_is_rejected_before_transfer() {
        let (pipeline, mut rx) = pipeline_with(1024 * 1024);
        let err = pipeline
            .reject_known_oversize(&metadata(Some(2 * 1024 * 1024)))
            .unwrap_err();
        assert!(matches!(err, YtMp3Error::SizeLimitExceeded { limit_mb: 1 }));
        assert!(matches!(
            rx.try_recv().unwrap(),
            PipelineStage::Failed { stage: "resolve", .. }
        ));
    }

    #[test]
    fn unknown_or_small_sizes_pass() {
        let (pipeline, _rx) = pipeline_with(1024 * 1024);
        assert!(pipeline.reject_known_oversize(&metadata(None)).is_ok());
        assert!(pipeline
            .reject_known_oversize(&metadata(Some(512 * 1024)))
            .is_ok());
    }

    #[tokio::test]
    async fn invalid_url_fails_without_any_subprocess() {
        let (tx, mut rx) = mpsc::channel(8);
        let config = PipelineConfig {
            url: "http://evil.example.com/x".into(),
            output_dir: PathBuf::from("."),
            format: AudioFormat::Mp3,
            quality: AudioQuality::High,
            max_filesize: 500 * 1024 * 1024,
            yt_dlp: None,
            ffmpeg: None,
        };
        let err = Pipeline::new(config, tx).run().await.unwrap_err();
        assert!(matches!(err, YtMp3Error::InvalidUrl(_)));
        assert_eq!(err.exit_code(), 2);

        assert!(matches!(rx.recv().await, Some(PipelineStage::Validating)));
        assert!(matches!(
            rx.recv().await,
            Some(PipelineStage::Failed { stage: "validate", .. })
        ));
    }

    #[tokio::test]
    async fn missing_output_dir_fails_validation() {
        let (tx, _rx) = mpsc::channel(8);
        let config = PipelineConfig {
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
            output_dir: PathBuf::from("/no/such/dir"),
            format: AudioFormat::Mp3,
            quality: AudioQuality::High,
            max_filesize: 500 * 1024 * 1024,
            yt_dlp: None,
            ffmpeg: None,
        };
        let err = Pipeline::new(config, tx).run().await.unwrap_err();
        assert!(matches!(err, YtMp3Error::InvalidOutputDir(_)));
        assert_eq!(err.exit_code(), 3);
    }
}
