//! Downloader/converter adapter around the external yt-dlp executable.
//!
//! yt-dlp resolves the URL and streams the audio; ffmpeg is driven through
//! yt-dlp's audio-extraction post-processing hook rather than invoked here.
//! Every subprocess is built as an explicit argument list; nothing is ever
//! passed through a shell.

use crate::error::{ConversionError, DownloadError, YtMp3Error};
use crate::format::{effective_quality, AudioFormat, AudioQuality};
use crate::validate::ValidatedUrl;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Marker prefixed to machine-readable progress lines so they cannot be
/// confused with the rest of yt-dlp's output.
const PROGRESS_MARKER: &str = "YTMP3|";

/// Most stderr lines kept for failure classification.
const STDERR_KEEP: usize = 200;

/// Progress callback contract: bytes transferred so far (non-decreasing) and
/// the total if known. Invoked synchronously from the download read loop, so
/// it must return quickly and must not panic.
pub type ProgressFn<'a> = &'a mut dyn FnMut(u64, Option<u64>);

/// Every knob passed to yt-dlp, enumerated explicitly. There is no
/// free-form option bag; adding a setting means adding a field here and a
/// rendered argument in [`Downloader::download_args`].
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub yt_dlp: PathBuf,
    pub ffmpeg: PathBuf,
    pub format: AudioFormat,
    pub quality: AudioQuality,
    /// Hard cap on transferred bytes; enforced both up front via
    /// `--max-filesize` and mid-stream from progress reports.
    pub max_filesize: u64,
}

/// Subset of yt-dlp's `-J` metadata this tool consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub filesize_approx: Option<u64>,
}

/// A converted audio file sitting in the scratch directory, ready to be
/// moved to its final location.
#[derive(Debug)]
pub struct FetchedAudio {
    pub path: PathBuf,
    pub size_bytes: u64,
}

pub struct Downloader {
    options: DownloadOptions,
}

impl Downloader {
    pub fn new(options: DownloadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Resolve video metadata without transferring the stream.
    pub async fn probe(&self, url: &ValidatedUrl) -> Result<VideoMetadata, DownloadError> {
        info!("resolving metadata for {}", url);

        let output = Command::new(&self.options.yt_dlp)
            .args(["--dump-single-json", "--no-playlist", "--no-warnings"])
            .arg(url.as_str())
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp metadata stderr: {}", stderr);
            return Err(classify_download_failure(&stderr, output.status.code()));
        }

        let metadata: VideoMetadata = serde_json::from_slice(&output.stdout)
            .map_err(|e| DownloadError::MetadataParse(e.to_string()))?;
        debug!("resolved: {} ({})", metadata.title, metadata.id);
        Ok(metadata)
    }

    /// Download the audio stream into `scratch` and convert it to
    /// `<stem>.<ext>` there. Partial files never leave the scratch
    /// directory; on any failure the caller drops the directory whole.
    pub async fn fetch_and_convert(
        &self,
        url: &ValidatedUrl,
        scratch: &Path,
        stem: &str,
        progress: ProgressFn<'_>,
    ) -> Result<FetchedAudio, YtMp3Error> {
        let template = scratch.join(format!("{stem}.%(ext)s"));
        let args = self.download_args(&template);

        info!("fetching audio stream from {}", url);
        let mut child = Command::new(&self.options.yt_dlp)
            .args(&args)
            .arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(DownloadError::Io)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Io(pipe_error()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Io(pipe_error()))?;

        // Drain stderr on the side so a chatty child cannot block on a full
        // pipe while we read stdout.
        let stderr_task = tokio::spawn(async move {
            let mut kept = Vec::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("yt-dlp stderr: {}", line);
                if kept.len() == STDERR_KEEP {
                    kept.remove(0);
                }
                kept.push(line);
            }
            kept
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut last_done = 0u64;
        let mut breached = false;
        let mut skipped_oversize = false;

        while let Some(line) = lines.next_line().await.map_err(DownloadError::Io)? {
            if let Some((done, total)) = parse_progress_line(&line) {
                // yt-dlp occasionally reports a stale smaller value after a
                // fragment retry; keep the callback monotone.
                last_done = last_done.max(done);
                progress(last_done, total);

                if last_done > self.options.max_filesize {
                    warn!(
                        "transfer exceeded the {} byte ceiling, aborting",
                        self.options.max_filesize
                    );
                    breached = true;
                    let _ = child.start_kill();
                    break;
                }
            } else {
                if line.contains("larger than max-filesize") {
                    skipped_oversize = true;
                }
                debug!("yt-dlp: {}", line);
            }
        }

        let status = child.wait().await.map_err(DownloadError::Io)?;
        let stderr_lines = stderr_task.await.unwrap_or_default();

        if breached || skipped_oversize {
            return Err(self.size_limit_error());
        }

        if !status.success() {
            let stderr_text = stderr_lines.join("\n");
            if stderr_text.contains("max-filesize") {
                return Err(self.size_limit_error());
            }
            if let Some(reason) = postprocess_failure(&stderr_text) {
                return Err(ConversionError::Postprocess(reason).into());
            }
            return Err(classify_download_failure(&stderr_text, status.code()).into());
        }

        let path = self.find_converted_file(scratch, stem)?;
        let size_bytes = std::fs::metadata(&path).map_err(DownloadError::Io)?.len();
        debug!("converted file: {} ({} bytes)", path.display(), size_bytes);

        Ok(FetchedAudio { path, size_bytes })
    }

    /// Render the locked-down yt-dlp argument list for a download.
    fn download_args(&self, template: &Path) -> Vec<String> {
        let mut args = vec![
            // One URL, one file, even when the link carries playlist params.
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            format!(
                "download:{PROGRESS_MARKER}%(progress.downloaded_bytes)s|\
                 %(progress.total_bytes)s|%(progress.total_bytes_estimate)s"
            ),
            "-f".to_string(),
            "bestaudio/best".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            self.options.format.codec().to_string(),
            "--max-filesize".to_string(),
            self.options.max_filesize.to_string(),
            "--ffmpeg-location".to_string(),
            self.options.ffmpeg.display().to_string(),
            "-o".to_string(),
            template.display().to_string(),
        ];

        if let Some(bitrate) = effective_quality(self.options.format, self.options.quality) {
            args.push("--audio-quality".to_string());
            args.push(bitrate.to_string());
        }

        args
    }

    fn size_limit_error(&self) -> YtMp3Error {
        YtMp3Error::SizeLimitExceeded {
            limit_mb: self.options.max_filesize / (1024 * 1024),
        }
    }

    /// Locate the converted output. The extension is deterministic for the
    /// configured format, but scan for the stem as a fallback in case the
    /// converter picked a container variant.
    fn find_converted_file(&self, scratch: &Path, stem: &str) -> Result<PathBuf, DownloadError> {
        let expected = scratch.join(format!("{stem}.{}", self.options.format.extension()));
        if expected.exists() {
            return Ok(expected);
        }

        for entry in std::fs::read_dir(scratch)? {
            let path = entry?.path();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let partial = name.ends_with(".part") || name.ends_with(".ytdl");
            if path.is_file() && !partial && name.starts_with(stem) {
                return Ok(path);
            }
        }

        Err(DownloadError::MissingOutput)
    }
}

fn pipe_error() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::BrokenPipe, "child pipe not captured")
}

/// Parse a `--progress-template` line: `YTMP3|<done>|<total>|<estimate>`.
/// yt-dlp prints `NA` for fields it does not know yet.
fn parse_progress_line(line: &str) -> Option<(u64, Option<u64>)> {
    let rest = line.trim().strip_prefix(PROGRESS_MARKER)?;
    let mut parts = rest.split('|');
    let done = parse_bytes(parts.next()?)?;
    let total = parts.next().and_then(parse_bytes);
    let estimate = parts.next().and_then(parse_bytes);
    Some((done, total.or(estimate)))
}

/// Byte counts arrive as integers, estimates sometimes as floats.
fn parse_bytes(field: &str) -> Option<u64> {
    let field = field.trim();
    if let Ok(n) = field.parse::<u64>() {
        return Some(n);
    }
    field.parse::<f64>().ok().map(|f| f as u64)
}

/// Map yt-dlp's stderr to the download failure taxonomy. The reason strings
/// mirror what yt-dlp reports for unavailable content.
fn classify_download_failure(stderr: &str, code: Option<i32>) -> DownloadError {
    if stderr.contains("Video unavailable") || stderr.contains("has been removed") {
        return DownloadError::VideoUnavailable;
    }
    if stderr.contains("Private video") {
        return DownloadError::PrivateVideo;
    }
    if stderr.contains("age-restricted") || stderr.contains("confirm your age") {
        return DownloadError::AgeRestricted;
    }
    if let Some(line) = stderr.lines().rev().find(|l| l.starts_with("ERROR:")) {
        return DownloadError::Extractor(line.trim_start_matches("ERROR:").trim().to_string());
    }
    DownloadError::ExtractorExit(code)
}

/// Detect a converter failure surfaced through yt-dlp's post-processing
/// hook, as opposed to a failure of the transfer itself.
fn postprocess_failure(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .find(|l| l.contains("Postprocessing"))
        .map(|l| l.trim_start_matches("ERROR:").trim().to_string())
}
