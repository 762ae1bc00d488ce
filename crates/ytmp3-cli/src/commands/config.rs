use anyhow::{Context, Result};
use std::path::Path;

use ytmp3_core::config::Config;

pub async fn run(init: bool, config_path: Option<&Path>) -> Result<()> {
    if init {
        return write_sample(config_path);
    }

    let config = Config::load(config_path)?;

    println!("ytmp3 configuration\n");

    println!("[paths]");
    match config.paths.yt_dlp {
        Some(ref p) => println!("  yt_dlp = {:?}", p),
        None => println!("  yt_dlp = (auto-detect)"),
    }
    match config.paths.ffmpeg {
        Some(ref p) => println!("  ffmpeg = {:?}", p),
        None => println!("  ffmpeg = (auto-detect)"),
    }

    println!("\n[output]");
    println!(
        "  default_directory = {:?}",
        config.output.default_directory
    );
    println!("  default_format = {}", config.output.default_format);
    println!("  default_quality = {}", config.output.default_quality);

    println!("\n[limits]");
    println!("  max_filesize_mb = {}", config.limits.max_filesize_mb);

    println!("\n[batch]");
    println!("  playlist_end = {}", config.batch.playlist_end);
    println!("  continue_on_error = {}", config.batch.continue_on_error);

    println!("\nConfig sources (later wins):");
    if let Some(default) = Config::default_config_file() {
        println!("  1. {}", default.display());
    }
    if let Some(p) = config_path {
        println!("  2. {} (--config)", p.display());
    }
    println!("  3. YTMP3_* environment variables");

    Ok(())
}

fn write_sample(config_path: Option<&Path>) -> Result<()> {
    let target = match config_path {
        Some(p) => p.to_path_buf(),
        None => Config::default_config_file()
            .context("no config directory available on this platform")?,
    };

    if target.exists() {
        anyhow::bail!(
            "{} already exists; remove it first to regenerate",
            target.display()
        );
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let sample = Config::default().sample_toml()?;
    std::fs::write(&target, sample)
        .with_context(|| format!("failed to write {}", target.display()))?;

    println!("Wrote sample config to {}", target.display());
    println!("Edit it to customize your defaults.");
    Ok(())
}
