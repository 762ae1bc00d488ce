use anyhow::Result;
use std::path::Path;

use crate::args::DownloadArgs;
use crate::commands::download::download_one;
use ytmp3_core::{
    config::Config, deps, playlist::extract_playlist_entries, validate::validate_url, YtMp3Error,
};

pub async fn run(url: &str, options: &DownloadArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    let validated = validate_url(url).map_err(YtMp3Error::from)?;

    // The expansion itself needs yt-dlp; probe it before going near the
    // network.
    let yt_dlp = deps::check_yt_dlp(config.paths.yt_dlp.as_deref())
        .await
        .map_err(YtMp3Error::from)?;

    println!("Expanding playlist...");
    let entries = extract_playlist_entries(&yt_dlp.path, &validated, config.batch.playlist_end)
        .await
        .map_err(YtMp3Error::from)?;

    if entries.is_empty() {
        println!("No videos found in playlist");
        return Ok(());
    }

    println!("Found {} videos\n", entries.len());
    for (idx, entry) in entries.iter().take(10).enumerate() {
        println!(
            "  {:>3}. {}  [{}]  {}",
            idx + 1,
            entry.title,
            format_duration(entry.duration),
            entry.uploader.as_deref().unwrap_or("unknown"),
        );
    }
    if entries.len() > 10 {
        println!("  ... and {} more", entries.len() - 10);
    }
    println!();

    let total = entries.len();
    let mut succeeded = 0usize;
    let mut failures: Vec<(String, YtMp3Error)> = Vec::new();

    for (idx, entry) in entries.iter().enumerate() {
        println!("[{}/{}] {}", idx + 1, total, entry.title);
        match download_one(&config, options, &entry.url).await {
            Ok(outcome) => {
                succeeded += 1;
                println!("  -> {}", outcome.output.display());
            }
            Err(e) => {
                println!("  -> failed: {e}");
                failures.push((entry.url.clone(), e));
                if !config.batch.continue_on_error {
                    break;
                }
            }
        }
    }

    println!("\n=== Playlist Complete ===");
    println!("Succeeded: {succeeded}");
    println!("Failed: {}", failures.len());
    if !failures.is_empty() {
        println!("\nFailed URLs:");
        for (url, err) in &failures {
            println!("  {url} - {err}");
        }
        if succeeded == 0 {
            if let Some((_, err)) = failures.pop() {
                return Err(err.into());
            }
        }
    }

    Ok(())
}

fn format_duration(duration: Option<f64>) -> String {
    match duration {
        Some(seconds) => {
            let seconds = seconds as u64;
            format!("{}:{:02}", seconds / 60, seconds % 60)
        }
        None => "?:??".to_string(),
    }
}
