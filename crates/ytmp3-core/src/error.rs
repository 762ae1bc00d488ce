//! Error types for ytmp3-core

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, YtMp3Error>;

#[derive(Error, Debug)]
pub enum YtMp3Error {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("invalid output directory: {0}")]
    InvalidOutputDir(#[from] OutputDirError),

    #[error("missing dependency: {0}")]
    MissingDependency(#[from] DependencyError),

    #[error("download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("download exceeds the {limit_mb} MB size limit")]
    SizeLimitExceeded { limit_mb: u64 },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl YtMp3Error {
    /// Stable process exit code for this failure kind.
    ///
    /// The mapping is part of the CLI contract and must not change between
    /// releases: 2 invalid URL, 3 invalid output directory, 4 missing
    /// dependency, 5 download failure, 6 conversion failure, 7 size limit
    /// exceeded. Everything else exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            YtMp3Error::InvalidUrl(_) => 2,
            YtMp3Error::InvalidOutputDir(_) => 3,
            YtMp3Error::MissingDependency(_) => 4,
            YtMp3Error::Download(_) => 5,
            YtMp3Error::Conversion(_) => 6,
            YtMp3Error::SizeLimitExceeded { .. } => 7,
            YtMp3Error::Config(_) | YtMp3Error::Io(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum UrlError {
    #[error("not an absolute URL: {0}")]
    Unparseable(#[from] url::ParseError),

    #[error("scheme {0:?} is not allowed, only https")]
    SchemeNotHttps(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("host {0:?} is not a recognized YouTube host")]
    HostNotAllowed(String),

    #[error("URL does not reference a video or playlist")]
    NoVideoReference,
}

#[derive(Error, Debug)]
pub enum OutputDirError {
    #[error("{0} does not exist")]
    Missing(PathBuf),

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("{0} is not writable: {1}")]
    NotWritable(PathBuf, #[source] std::io::Error),

    #[error("{0} is inside the protected system path {1}")]
    DenyListed(PathBuf, PathBuf),

    #[error("{0} escapes the output directory")]
    Traversal(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("{tool} not found in PATH")]
    NotFound { tool: &'static str },

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} version probe failed with exit code {code:?}")]
    ProbeFailed { tool: &'static str, code: Option<i32> },
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("video is unavailable or has been removed")]
    VideoUnavailable,

    #[error("video is private and cannot be accessed")]
    PrivateVideo,

    #[error("video is age-restricted")]
    AgeRestricted,

    #[error("{0}")]
    Extractor(String),

    #[error("yt-dlp exited with code {0:?}")]
    ExtractorExit(Option<i32>),

    #[error("failed to parse video metadata: {0}")]
    MetadataParse(String),

    #[error("no output file was produced")]
    MissingOutput,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("audio conversion failed with exit code {exit_code:?}")]
    ConverterExit { exit_code: Option<i32> },

    #[error("post-processing failed: {0}")]
    Postprocess(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    LoadError(String),

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
