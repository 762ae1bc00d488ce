use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use ytmp3_core::format::{AudioFormat, AudioQuality};

#[derive(Parser)]
#[command(name = "ytmp3")]
#[command(author, version, about = "Download YouTube videos as MP3 files")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// YouTube URL to download (shorthand for `download <URL>`)
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Output directory for the converted file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Audio format
    #[arg(short, long, value_enum)]
    pub format: Option<CliFormat>,

    /// Audio quality
    #[arg(short, long, value_enum)]
    pub quality: Option<CliQuality>,

    /// Verbose output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download a single video as audio
    Download {
        /// YouTube URL
        url: String,

        #[command(flatten)]
        options: DownloadArgs,
    },

    /// Download every URL listed in a text file, one at a time
    Batch {
        /// File containing URLs, one per line
        input: PathBuf,

        #[command(flatten)]
        options: DownloadArgs,
    },

    /// Download a playlist, one entry at a time
    Playlist {
        /// YouTube playlist URL
        url: String,

        #[command(flatten)]
        options: DownloadArgs,
    },

    /// Check that yt-dlp and ffmpeg are installed
    Doctor,

    /// Show the effective configuration
    Config {
        /// Write a sample config file and exit
        #[arg(long)]
        init: bool,
    },
}

#[derive(clap::Args, Clone, Default)]
pub struct DownloadArgs {
    /// Output directory for the converted file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Audio format
    #[arg(short, long, value_enum)]
    pub format: Option<CliFormat>,

    /// Audio quality
    #[arg(short, long, value_enum)]
    pub quality: Option<CliQuality>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CliFormat {
    /// MP3 - Lossy, widely compatible (default)
    Mp3,
    /// FLAC - Lossless compression
    Flac,
    /// AAC - Lossy, good quality/size ratio
    Aac,
    /// OGG Vorbis - Lossy, open container
    Ogg,
    /// M4A - AAC in an MPEG-4 container
    M4a,
    /// WAV - Uncompressed PCM
    Wav,
}

impl From<CliFormat> for AudioFormat {
    fn from(value: CliFormat) -> Self {
        match value {
            CliFormat::Mp3 => AudioFormat::Mp3,
            CliFormat::Flac => AudioFormat::Flac,
            CliFormat::Aac => AudioFormat::Aac,
            CliFormat::Ogg => AudioFormat::Ogg,
            CliFormat::M4a => AudioFormat::M4a,
            CliFormat::Wav => AudioFormat::Wav,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CliQuality {
    /// 64 kbps - small files
    Low,
    /// 128 kbps - standard quality
    Medium,
    /// 192 kbps - high quality (default)
    High,
    /// 256 kbps - very high quality
    VeryHigh,
    /// 320 kbps - maximum bitrate
    Best,
    /// Best available, lossless when the format allows
    Lossless,
}

impl From<CliQuality> for AudioQuality {
    fn from(value: CliQuality) -> Self {
        match value {
            CliQuality::Low => AudioQuality::Low,
            CliQuality::Medium => AudioQuality::Medium,
            CliQuality::High => AudioQuality::High,
            CliQuality::VeryHigh => AudioQuality::VeryHigh,
            CliQuality::Best => AudioQuality::Best,
            CliQuality::Lossless => AudioQuality::Lossless,
        }
    }
}

impl Cli {
    /// Fold the top-level shorthand flags into a `DownloadArgs`.
    pub fn shorthand_options(&self) -> DownloadArgs {
        DownloadArgs {
            output: self.output.clone(),
            format: self.format,
            quality: self.quality,
        }
    }
}
