//! Prerequisite probing for the external tools.
//!
//! Both yt-dlp and ffmpeg are probed with a version query before any network
//! activity, so a missing tool fails fast. Probes are argument-list
//! subprocess calls; no shell is ever involved.

use crate::error::DependencyError;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// A resolved external tool and the version line it reported.
#[derive(Debug, Clone)]
pub struct ToolProbe {
    pub path: PathBuf,
    pub version: String,
}

/// Confirm ffmpeg is present and runnable.
pub async fn check_ffmpeg(configured: Option<&Path>) -> Result<ToolProbe, DependencyError> {
    probe("ffmpeg", configured, &["-version"]).await
}

/// Confirm yt-dlp is present and runnable.
pub async fn check_yt_dlp(configured: Option<&Path>) -> Result<ToolProbe, DependencyError> {
    probe("yt-dlp", configured, &["--version"]).await
}

async fn probe(
    tool: &'static str,
    configured: Option<&Path>,
    args: &[&str],
) -> Result<ToolProbe, DependencyError> {
    let path = match configured {
        Some(explicit) => explicit.to_path_buf(),
        None => which::which(tool).map_err(|_| DependencyError::NotFound { tool })?,
    };

    let output = Command::new(&path)
        .args(args)
        .output()
        .await
        .map_err(|source| DependencyError::Spawn { tool, source })?;

    if !output.status.success() {
        return Err(DependencyError::ProbeFailed {
            tool,
            code: output.status.code(),
        });
    }

    let version = String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string();
    debug!("{} probe ok: {}", tool, version);

    Ok(ToolProbe { path, version })
}
