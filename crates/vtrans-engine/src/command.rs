//! FFmpeg command builder.

use std::path::{Path, PathBuf};

use vtrans_models::{Codec, EncodeOptions};

/// Builder for FFmpeg transcode commands.
#[derive(Debug, Clone)]
pub struct TranscodeCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Log level
    log_level: String,
}

impl TranscodeCommand {
    /// Create a new command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    /// Build the standard transcode command for validated encode options.
    ///
    /// Audio follows the container: opus for webm outputs, aac for mp4.
    /// `-preset` and `-movflags faststart` only apply to the x264/x265 path.
    pub fn for_options(input: impl AsRef<Path>, output: impl AsRef<Path>, options: &EncodeOptions) -> Self {
        let mut cmd = Self::new(input, output)
            .video_codec(options.codec.as_str())
            .video_bitrate("10000k")
            .crf(18)
            .threads(2)
            .video_filter(scale_filter(&options.resolution));

        match options.codec {
            Codec::Libx264 | Codec::Libx265 => {
                cmd = cmd.audio_codec("aac").preset("slow").faststart();
            }
            Codec::Libvpx | Codec::LibvpxVp9 => {
                cmd = cmd.audio_codec("libopus");
            }
        }
        cmd
    }

    /// Add an output argument (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set video bitrate.
    pub fn video_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:v").output_arg(bitrate)
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set encoder preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Cap encoder threads.
    pub fn threads(self, threads: u8) -> Self {
        self.output_arg("-threads").output_arg(threads.to_string())
    }

    /// Move the moov atom up front for streamable mp4.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("faststart")
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter:v").output_arg(filter)
    }

    /// The output path this command writes to.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // Overwrite output
        args.push("-y".to_string());

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Scale filter for a `WxH` resolution string.
fn scale_filter(resolution: &str) -> String {
    format!("scale={}", resolution.replace('x', ":"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mp4_command() {
        let options = EncodeOptions::parse("1280x720-libx264").unwrap();
        let cmd = TranscodeCommand::for_options("in.mp4", "out.mp4", &options);
        let args = cmd.build_args();

        assert!(args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"aac".to_string()));
        assert!(args.contains(&"faststart".to_string()));
        assert!(args.contains(&"scale=1280:720".to_string()));
        // Progress goes to stderr
        assert!(args.contains(&"pipe:2".to_string()));
        // Output path last
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn test_webm_command_has_no_mp4_flags() {
        let options = EncodeOptions::parse("640x480-libvpx-vp9").unwrap();
        let args = TranscodeCommand::for_options("in.mp4", "out.webm", &options).build_args();

        assert!(args.contains(&"libvpx-vp9".to_string()));
        assert!(args.contains(&"libopus".to_string()));
        assert!(!args.contains(&"faststart".to_string()));
        assert!(!args.contains(&"-preset".to_string()));
    }
}
