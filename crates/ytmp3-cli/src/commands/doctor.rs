use anyhow::Result;
use std::path::Path;

use ytmp3_core::{config::Config, deps, YtMp3Error};

/// Report on the external tools. Exits with the missing-dependency code if
/// either is absent so scripts can gate on it.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("ytmp3 dependency check\n");

    let mut first_failure = None;

    print!("yt-dlp: ");
    match deps::check_yt_dlp(config.paths.yt_dlp.as_deref()).await {
        Ok(probe) => println!("OK ({}, {})", probe.version, probe.path.display()),
        Err(e) => {
            println!("NOT FOUND");
            println!("        Install instructions: https://github.com/yt-dlp/yt-dlp");
            first_failure.get_or_insert(e);
        }
    }

    print!("ffmpeg: ");
    match deps::check_ffmpeg(config.paths.ffmpeg.as_deref()).await {
        Ok(probe) => {
            // "ffmpeg version 6.1.1 ..." -> keep the number
            let version = probe
                .version
                .split_whitespace()
                .nth(2)
                .unwrap_or("unknown");
            println!("OK ({}, {})", version, probe.path.display());
        }
        Err(e) => {
            println!("NOT FOUND");
            println!("        Install instructions: https://ffmpeg.org/download.html");
            first_failure.get_or_insert(e);
        }
    }

    println!();
    match first_failure {
        None => {
            println!("All dependencies OK!");
            Ok(())
        }
        Some(e) => {
            println!("Some dependencies are missing. See above for instructions.");
            Err(YtMp3Error::from(e).into())
        }
    }
}
