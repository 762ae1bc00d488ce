//! Audio output formats and quality levels.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Flac,
    Aac,
    Ogg,
    M4a,
    Wav,
}

impl AudioFormat {
    /// Codec name passed to yt-dlp's `--audio-format`.
    pub fn codec(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
            AudioFormat::Aac => "aac",
            AudioFormat::Ogg => "vorbis",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
        }
    }

    /// Extension of the converted file.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
            AudioFormat::Aac => "aac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
        }
    }

    pub fn is_lossless(&self) -> bool {
        matches!(self, AudioFormat::Flac | AudioFormat::Wav)
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "flac" => Ok(AudioFormat::Flac),
            "aac" => Ok(AudioFormat::Aac),
            "ogg" | "vorbis" => Ok(AudioFormat::Ogg),
            "m4a" => Ok(AudioFormat::M4a),
            "wav" => Ok(AudioFormat::Wav),
            other => Err(format!("unsupported audio format: {other}")),
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioFormat::Mp3 => write!(f, "MP3"),
            AudioFormat::Flac => write!(f, "FLAC"),
            AudioFormat::Aac => write!(f, "AAC"),
            AudioFormat::Ogg => write!(f, "OGG Vorbis"),
            AudioFormat::M4a => write!(f, "M4A"),
            AudioFormat::Wav => write!(f, "WAV"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioQuality {
    Low,
    Medium,
    High,
    VeryHigh,
    Best,
    Lossless,
}

impl AudioQuality {
    /// Bitrate value passed to yt-dlp's `--audio-quality`; `"0"` asks for
    /// the best available.
    pub fn bitrate_arg(&self) -> &'static str {
        match self {
            AudioQuality::Low => "64",
            AudioQuality::Medium => "128",
            AudioQuality::High => "192",
            AudioQuality::VeryHigh => "256",
            AudioQuality::Best => "320",
            AudioQuality::Lossless => "0",
        }
    }
}

impl std::str::FromStr for AudioQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "64" | "low" => Ok(AudioQuality::Low),
            "128" | "medium" => Ok(AudioQuality::Medium),
            "192" | "high" => Ok(AudioQuality::High),
            "256" | "very_high" => Ok(AudioQuality::VeryHigh),
            "320" | "best" => Ok(AudioQuality::Best),
            "0" | "lossless" => Ok(AudioQuality::Lossless),
            other => Err(format!("unsupported audio quality: {other}")),
        }
    }
}

impl std::fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioQuality::Lossless => write!(f, "lossless"),
            other => write!(f, "{} kbps", other.bitrate_arg()),
        }
    }
}

/// The `--audio-quality` argument for a format/quality pair, or `None` when
/// the converter should be left at its default.
///
/// Lossless targets ignore the bitrate unless an explicit downsample was
/// requested; lossy targets clamp a `lossless` request to the highest
/// supported bitrate.
pub fn effective_quality(format: AudioFormat, quality: AudioQuality) -> Option<&'static str> {
    if format.is_lossless() {
        (quality != AudioQuality::Lossless).then(|| quality.bitrate_arg())
    } else if quality == AudioQuality::Lossless {
        Some(AudioQuality::Best.bitrate_arg())
    } else {
        Some(quality.bitrate_arg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_and_extension_diverge_for_ogg() {
        assert_eq!(AudioFormat::Ogg.codec(), "vorbis");
        assert_eq!(AudioFormat::Ogg.extension(), "ogg");
        assert_eq!(AudioFormat::Mp3.codec(), "mp3");
        assert_eq!(AudioFormat::Mp3.extension(), "mp3");
    }

    #[test]
    fn parses_names_and_bitrates() {
        assert_eq!("mp3".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert_eq!("VORBIS".parse::<AudioFormat>().unwrap(), AudioFormat::Ogg);
        assert!("mp4".parse::<AudioFormat>().is_err());

        assert_eq!("192".parse::<AudioQuality>().unwrap(), AudioQuality::High);
        assert_eq!("best".parse::<AudioQuality>().unwrap(), AudioQuality::Best);
        assert!("24".parse::<AudioQuality>().is_err());
    }

    #[test]
    fn lossless_formats_ignore_default_bitrate() {
        assert_eq!(
            effective_quality(AudioFormat::Flac, AudioQuality::Lossless),
            None
        );
        // Explicit downsample of a lossless target is honored.
        assert_eq!(
            effective_quality(AudioFormat::Flac, AudioQuality::Medium),
            Some("128")
        );
    }

    #[test]
    fn lossy_formats_clamp_lossless_to_best() {
        assert_eq!(
            effective_quality(AudioFormat::Mp3, AudioQuality::Lossless),
            Some("320")
        );
        assert_eq!(
            effective_quality(AudioFormat::Mp3, AudioQuality::High),
            Some("192")
        );
    }
}
