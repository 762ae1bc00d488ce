//! Playlist expansion and URL-file reading for batch downloads.
//!
//! Entries are expanded with a flat extraction (metadata only, no stream)
//! and then fed one at a time through the single-URL pipeline. Downloads are
//! strictly sequential.

use crate::error::DownloadError;
use crate::validate::ValidatedUrl;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// One video inside a playlist, before download.
#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    pub id: String,
    pub title: String,
    pub url: String,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FlatInfo {
    #[serde(default)]
    entries: Option<Vec<FlatEntry>>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    uploader: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FlatEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    uploader: Option<String>,
}

/// Expand a playlist URL into its entries without downloading anything.
///
/// `playlist_end` caps how many entries are even listed; the original cap of
/// 100 guards against unbounded playlists.
pub async fn extract_playlist_entries(
    yt_dlp: &Path,
    url: &ValidatedUrl,
    playlist_end: u32,
) -> Result<Vec<PlaylistEntry>, DownloadError> {
    info!("expanding playlist {}", url);

    let output = Command::new(yt_dlp)
        .args(["--dump-single-json", "--flat-playlist", "--no-warnings"])
        .args(["--playlist-end", &playlist_end.to_string()])
        .arg(url.as_str())
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if let Some(line) = stderr.lines().rev().find(|l| l.starts_with("ERROR:")) {
            return Err(DownloadError::Extractor(
                line.trim_start_matches("ERROR:").trim().to_string(),
            ));
        }
        return Err(DownloadError::ExtractorExit(output.status.code()));
    }

    let info: FlatInfo = serde_json::from_slice(&output.stdout)
        .map_err(|e| DownloadError::MetadataParse(e.to_string()))?;

    let entries = flatten(info);
    debug!("playlist expanded to {} entries", entries.len());
    Ok(entries)
}

fn flatten(info: FlatInfo) -> Vec<PlaylistEntry> {
    match info.entries {
        Some(entries) => entries
            .into_iter()
            .filter_map(|e| {
                let id = e.id.filter(|id| !id.is_empty())?;
                Some(PlaylistEntry {
                    url: watch_url(&id),
                    title: e.title.unwrap_or_else(|| "Unknown".to_string()),
                    id,
                    duration: e.duration,
                    uploader: e.uploader,
                })
            })
            .collect(),
        // A single video, not a playlist.
        None => match info.id {
            Some(id) if !id.is_empty() => vec![PlaylistEntry {
                url: watch_url(&id),
                title: info.title.unwrap_or_else(|| "Unknown".to_string()),
                id,
                duration: info.duration,
                uploader: info.uploader,
            }],
            _ => Vec::new(),
        },
    }
}

fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Read candidate URLs from a text file: one per line, blank lines and `#`
/// comments skipped.
pub fn read_url_file(path: &Path) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect())
}
