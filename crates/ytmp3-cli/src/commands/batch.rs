use anyhow::{Context, Result};
use std::path::Path;

use crate::args::DownloadArgs;
use crate::commands::download::download_one;
use ytmp3_core::{config::Config, playlist::read_url_file, validate::validate_url, YtMp3Error};

pub async fn run(input: &Path, options: &DownloadArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    let candidates = read_url_file(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    if candidates.is_empty() {
        println!("No URLs found in {}", input.display());
        return Ok(());
    }

    // Weed out anything that is not a well-formed YouTube URL before any
    // download starts.
    let mut urls = Vec::new();
    for candidate in candidates {
        match validate_url(&candidate) {
            Ok(_) => urls.push(candidate),
            Err(e) => println!("Skipping invalid URL {candidate}: {e}"),
        }
    }
    if urls.is_empty() {
        anyhow::bail!("no valid YouTube URLs in {}", input.display());
    }

    let total = urls.len();
    println!("Downloading {total} URLs, one at a time\n");

    let mut succeeded = 0usize;
    let mut failures: Vec<(String, YtMp3Error)> = Vec::new();

    for (idx, url) in urls.iter().enumerate() {
        println!("[{}/{}] {}", idx + 1, total, url);
        match download_one(&config, options, url).await {
            Ok(outcome) => {
                succeeded += 1;
                println!("  -> {}", outcome.output.display());
            }
            Err(e) => {
                println!("  -> failed: {e}");
                failures.push((url.clone(), e));
                if !config.batch.continue_on_error {
                    break;
                }
            }
        }
    }

    println!("\n=== Batch Complete ===");
    println!("Succeeded: {succeeded}");
    println!("Failed: {}", failures.len());

    if !failures.is_empty() {
        println!("\nFailed URLs:");
        for (url, err) in &failures {
            println!("  {url} - {err}");
        }
        // Nothing worked at all: propagate the last failure so the exit
        // code reflects the kind.
        if succeeded == 0 {
            if let Some((_, err)) = failures.pop() {
                return Err(err.into());
            }
        }
    }

    Ok(())
}
