//! Encode option parsing.
//!
//! Callers select resolution and codec as a single compound string,
//! `"<resolution>-<codec>"` (e.g. `"1280x720-libx264"`). Both parts are
//! validated here, before anything reaches a process invocation: resolutions
//! must be `WxH` digits and codecs must come from a fixed whitelist.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing a compound transcoding option.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("Transcoding option must be \"<resolution>-<codec>\", got {0:?}")]
    Malformed(String),

    #[error("Invalid resolution {0:?}, expected WxH (e.g. 1280x720)")]
    InvalidResolution(String),

    #[error("Unsupported codec {0:?}")]
    UnsupportedCodec(String),
}

/// Whitelisted video codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Codec {
    Libx264,
    Libx265,
    Libvpx,
    LibvpxVp9,
}

impl Codec {
    /// The ffmpeg encoder name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Libx264 => "libx264",
            Codec::Libx265 => "libx265",
            Codec::Libvpx => "libvpx",
            Codec::LibvpxVp9 => "libvpx-vp9",
        }
    }

    /// Container extension for this codec.
    pub fn container_ext(&self) -> &'static str {
        match self {
            Codec::Libvpx | Codec::LibvpxVp9 => "webm",
            Codec::Libx264 | Codec::Libx265 => "mp4",
        }
    }

    fn parse(s: &str) -> Result<Self, OptionsError> {
        match s {
            "libx264" => Ok(Codec::Libx264),
            "libx265" => Ok(Codec::Libx265),
            "libvpx" => Ok(Codec::Libvpx),
            "libvpx-vp9" => Ok(Codec::LibvpxVp9),
            other => Err(OptionsError::UnsupportedCodec(other.to_string())),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated encode parameters for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeOptions {
    /// Target resolution as `WxH` (e.g. "1280x720")
    pub resolution: String,
    /// Target video codec
    pub codec: Codec,
}

impl EncodeOptions {
    /// Parse a compound `"<resolution>-<codec>"` option string.
    ///
    /// The codec may itself contain a dash (`libvpx-vp9`), so only the first
    /// dash separates the two parts.
    pub fn parse(option: &str) -> Result<Self, OptionsError> {
        let (resolution, codec) = option
            .split_once('-')
            .ok_or_else(|| OptionsError::Malformed(option.to_string()))?;

        if resolution.is_empty() || codec.is_empty() {
            return Err(OptionsError::Malformed(option.to_string()));
        }

        let (w, h) = resolution
            .split_once('x')
            .ok_or_else(|| OptionsError::InvalidResolution(resolution.to_string()))?;
        let valid_dims = !w.is_empty()
            && !h.is_empty()
            && w.parse::<u32>().map(|v| v > 0).unwrap_or(false)
            && h.parse::<u32>().map(|v| v > 0).unwrap_or(false);
        if !valid_dims {
            return Err(OptionsError::InvalidResolution(resolution.to_string()));
        }

        Ok(Self {
            resolution: resolution.to_string(),
            codec: Codec::parse(codec)?,
        })
    }

    /// Output filename for a job, `<job_id>.<ext>`.
    pub fn output_filename(&self, job_id: &crate::JobId) -> String {
        format!("{}.{}", job_id, self.codec.container_ext())
    }
}

impl fmt::Display for EncodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.resolution, self.codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobId;

    #[test]
    fn test_parse_valid_options() {
        let opts = EncodeOptions::parse("1280x720-libx264").unwrap();
        assert_eq!(opts.resolution, "1280x720");
        assert_eq!(opts.codec, Codec::Libx264);
        assert_eq!(opts.codec.container_ext(), "mp4");
    }

    #[test]
    fn test_parse_dashed_codec() {
        let opts = EncodeOptions::parse("1920x1080-libvpx-vp9").unwrap();
        assert_eq!(opts.codec, Codec::LibvpxVp9);
        assert_eq!(opts.codec.container_ext(), "webm");
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        assert!(matches!(
            EncodeOptions::parse("1280x720"),
            Err(OptionsError::Malformed(_))
        ));
        assert!(matches!(
            EncodeOptions::parse("-libx264"),
            Err(OptionsError::Malformed(_))
        ));
        assert!(matches!(
            EncodeOptions::parse("1280x720-"),
            Err(OptionsError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_resolution() {
        assert!(matches!(
            EncodeOptions::parse("widexhigh-libx264"),
            Err(OptionsError::InvalidResolution(_))
        ));
        assert!(matches!(
            EncodeOptions::parse("0x720-libx264"),
            Err(OptionsError::InvalidResolution(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unlisted_codec() {
        // Caller input is never forwarded to ffmpeg unvalidated.
        assert!(matches!(
            EncodeOptions::parse("1280x720-libx264;rm"),
            Err(OptionsError::UnsupportedCodec(_))
        ));
    }

    #[test]
    fn test_output_filename() {
        let job_id = JobId::from_string("j1");
        let opts = EncodeOptions::parse("640x480-libvpx").unwrap();
        assert_eq!(opts.output_filename(&job_id), "j1.webm");
    }
}
