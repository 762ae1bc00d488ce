//! Configuration management for ytmp3.
//!
//! Settings are never required: compiled defaults work out of the box and
//! are merged with the user config file, an explicit `--config` file and
//! `YTMP3_*` environment variables, in that order.

use crate::error::ConfigError;
use crate::format::{AudioFormat, AudioQuality};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Path to the yt-dlp binary (auto-detected if not set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yt_dlp: Option<PathBuf>,
    /// Path to the ffmpeg binary (auto-detected if not set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output directory
    pub default_directory: PathBuf,
    /// Default audio format
    pub default_format: AudioFormat,
    /// Default audio quality
    pub default_quality: AudioQuality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Hard cap on a single download, in megabytes
    pub max_filesize_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Playlists are truncated to this many entries
    pub playlist_end: u32,
    /// Keep going after a failed entry
    pub continue_on_error: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_directory: PathBuf::from("."),
            default_format: AudioFormat::Mp3,
            default_quality: AudioQuality::High,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_filesize_mb: 500,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            playlist_end: 100,
            continue_on_error: true,
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(default_config) = Self::default_config_file() {
            if default_config.exists() {
                figment = figment.merge(Toml::file(&default_config));
            }
        }

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("YTMP3_").split("_"));

        figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// `<config_dir>/ytmp3/config.toml`, if a config dir exists on this
    /// platform.
    pub fn default_config_file() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ytmp3/config.toml"))
    }

    pub fn max_filesize_bytes(&self) -> u64 {
        self.limits.max_filesize_mb.saturating_mul(1024 * 1024)
    }

    /// Render the current settings as a commented sample config file.
    pub fn sample_toml(&self) -> Result<String, ConfigError> {
        let body =
            toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        Ok(format!(
            "# ytmp3 configuration\n# Values here are merged under YTMP3_* environment variables.\n\n{body}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.output.default_format, AudioFormat::Mp3);
        assert_eq!(config.output.default_quality, AudioQuality::High);
        assert_eq!(config.limits.max_filesize_mb, 500);
        assert_eq!(config.max_filesize_bytes(), 500 * 1024 * 1024);
        assert_eq!(config.batch.playlist_end, 100);
        assert!(config.paths.yt_dlp.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(
            &file,
            "[limits]\nmax_filesize_mb = 64\n\n[output]\ndefault_format = \"flac\"\ndefault_quality = \"lossless\"\ndefault_directory = \"/tmp/music\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&file)).unwrap();
        assert_eq!(config.limits.max_filesize_mb, 64);
        assert_eq!(config.output.default_format, AudioFormat::Flac);
        assert_eq!(config.output.default_quality, AudioQuality::Lossless);
        assert_eq!(config.output.default_directory, PathBuf::from("/tmp/music"));
        // Untouched sections keep their defaults.
        assert_eq!(config.batch.playlist_end, 100);
    }

    #[test]
    fn sample_round_trips() {
        // TOML comments are part of the sample; the parser takes them as-is.
        let sample = Config::default().sample_toml().unwrap();
        let parsed: Config = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.limits.max_filesize_mb, 500);
        assert_eq!(parsed.output.default_format, AudioFormat::Mp3);
    }
}
