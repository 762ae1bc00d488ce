use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio::sync::mpsc;

use crate::args::DownloadArgs;
use ytmp3_core::{
    config::Config,
    pipeline::{DownloadOutcome, Pipeline, PipelineConfig, PipelineStage},
    YtMp3Error,
};

pub async fn run(url: &str, options: &DownloadArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let outcome = download_one(&config, options, url).await?;

    println!("\nSuccessfully downloaded: {}", outcome.title);
    println!("Saved to: {}", outcome.output.display());
    Ok(())
}

/// Run the pipeline for one URL with a progress bar. Shared by the batch
/// and playlist commands.
pub async fn download_one(
    config: &Config,
    options: &DownloadArgs,
    url: &str,
) -> Result<DownloadOutcome, YtMp3Error> {
    let mut pipeline_config = PipelineConfig::from_config(config, url.to_string());
    if let Some(ref output) = options.output {
        pipeline_config.output_dir = output.clone();
    }
    if let Some(format) = options.format {
        pipeline_config.format = format.into();
    }
    if let Some(quality) = options.quality {
        pipeline_config.quality = quality.into();
    }

    let (tx, mut rx) = mpsc::channel(32);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}",
        )
        .expect("valid template")
        .progress_chars("=>-"),
    );

    let progress_handle = tokio::spawn(async move {
        while let Some(stage) = rx.recv().await {
            match stage {
                PipelineStage::Validating => {
                    pb.set_message("Validating input...");
                }
                PipelineStage::CheckingPrerequisites => {
                    pb.set_message("Checking yt-dlp and ffmpeg...");
                }
                PipelineStage::Resolving => {
                    pb.set_message("Resolving video metadata...");
                }
                PipelineStage::Downloading {
                    title,
                    downloaded,
                    total,
                } => {
                    if let Some(total) = total {
                        pb.set_length(total);
                    }
                    pb.set_position(downloaded);
                    pb.set_message(format!("Downloading: {}", truncate(&title, 40)));
                }
                PipelineStage::Converting { format } => {
                    pb.set_message(format!("Converting to {format}..."));
                }
                PipelineStage::Complete {
                    output,
                    size_bytes: _,
                    elapsed,
                } => {
                    pb.finish_with_message(format!(
                        "Done: {} ({:.1}s)",
                        output.display(),
                        elapsed.as_secs_f32()
                    ));
                    break;
                }
                PipelineStage::Failed { stage, error } => {
                    pb.abandon_with_message(format!("Failed at {stage}: {error}"));
                    break;
                }
            }
        }
    });

    // The temporary pipeline drops its sender with this statement, so the
    // render task always sees the channel close.
    let result = Pipeline::new(pipeline_config, tx).run().await;

    let _ = progress_handle.await;
    result
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
