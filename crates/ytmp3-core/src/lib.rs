//! ytmp3-core: validation, sanitization and the yt-dlp download pipeline.

pub mod config;
pub mod deps;
pub mod downloader;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod playlist;
pub mod sanitize;
pub mod validate;

pub use config::Config;
pub use error::{Result, YtMp3Error};
