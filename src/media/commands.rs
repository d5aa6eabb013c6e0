use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SubtransError};

/// An ffmpeg invocation built up argument by argument
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    pub fn subtitle_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:s").arg(codec)
    }

    /// Copy every stream that is not re-encoded explicitly
    pub fn copy_streams(self) -> Self {
        self.arg("-c").arg("copy")
    }

    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Map a stream of an input into the output
    pub fn map<S: Into<String>>(self, stream: S) -> Self {
        self.arg("-map").arg(stream)
    }

    /// Run the command, returning stdout on success
    pub async fn execute(&self) -> Result<String> {
        debug!("Executing {}: {} {:?}", self.description, self.binary_path, self.args);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| SubtransError::Media(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubtransError::Media(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Subtitle codec accepted by the container of `output_path`
pub fn subtitle_codec_for<P: AsRef<Path>>(output_path: P) -> &'static str {
    let extension = output_path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("mkv") => "srt",
        Some("webm") => "webvtt",
        _ => "mov_text",
    }
}

/// Escape a path for use inside an ffmpeg filter argument
pub fn escape_filter_path<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .to_string_lossy()
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

/// Builder for the ffmpeg operations the workflow needs
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Mono 16 kHz PCM WAV, the input format speech recognizers expect
    pub fn extract_audio<P: AsRef<Path>>(&self, video_path: P, audio_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio extraction")
            .input(video_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(16000)
            .audio_channels(1)
            .overwrite()
            .output(audio_path)
    }

    /// Mux the subtitle file as a selectable stream without re-encoding
    pub fn soft_subtitles<P: AsRef<Path>>(&self, video_path: P, subtitle_path: P, output_path: P) -> MediaCommand {
        let codec = subtitle_codec_for(&output_path);
        MediaCommand::new(&self.binary_path, "Subtitle muxing")
            .overwrite()
            .input(video_path)
            .input(subtitle_path)
            .map("0:v?")
            .map("0:a?")
            .map("1:0")
            .copy_streams()
            .subtitle_codec(codec)
            .output(output_path)
    }

    /// Render the subtitles into the picture
    pub fn burn_subtitles<P: AsRef<Path>>(
        &self,
        video_path: P,
        subtitle_path: P,
        output_path: P,
        additional_options: &[String],
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Subtitle burn-in")
            .overwrite()
            .input(video_path)
            .video_filter(format!("subtitles='{}'", escape_filter_path(subtitle_path)))
            .video_codec("libx264")
            .copy_audio()
            .args(additional_options.iter().cloned())
            .output(output_path)
    }

    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_audio_args() {
        let cmd = MediaCommandBuilder::new("ffmpeg").extract_audio("in.mp4", "out.wav");
        assert_eq!(
            cmd.args,
            vec!["-i", "in.mp4", "-vn", "-c:a", "pcm_s16le", "-ar", "16000", "-ac", "1", "-y", "out.wav"]
        );
    }

    #[test]
    fn test_soft_subtitles_picks_container_codec() {
        let builder = MediaCommandBuilder::new("ffmpeg");
        let mp4 = builder.soft_subtitles("in.mp4", "subs.srt", "out.mp4");
        assert!(mp4.args.windows(2).any(|w| w == ["-c:s", "mov_text"]));
        assert!(mp4.args.windows(2).any(|w| w == ["-c", "copy"]));

        let mkv = builder.soft_subtitles("in.mkv", "subs.srt", "out.mkv");
        assert!(mkv.args.windows(2).any(|w| w == ["-c:s", "srt"]));
    }

    #[test]
    fn test_burn_subtitles_appends_options() {
        let options = vec!["-crf".to_string(), "23".to_string()];
        let cmd = MediaCommandBuilder::new("ffmpeg").burn_subtitles("in.mp4", "C:/subs.srt", "out.mp4", &options);
        assert!(cmd.args.contains(&"subtitles='C\\:/subs.srt'".to_string()));
        assert!(cmd.args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert_eq!(cmd.args[cmd.args.len() - 3..], ["-crf", "23", "out.mp4"]);
    }
}
