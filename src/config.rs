use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use crate::error::{Result, SubtransError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub transcriber: TranscriberConfig,
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

/// Readability bounds used by the segment timing engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Segments shorter than this (seconds) are merge candidates
    pub min_duration: f64,
    /// Segments longer than this (seconds) are split
    pub max_duration: f64,
    /// Character budget of a single caption
    pub max_chars: usize,
    /// Largest silence (seconds) two segments may be merged across
    pub max_gap: f64,
    /// Enforced silence between adjacent captions (seconds)
    pub guard_gap: f64,
    /// Assumed reading speed in words per second
    pub reading_speed: f64,
    /// Upper bound of the end extension applied to merged captions (seconds)
    pub max_extension: f64,
    /// Extend merged captions that are still too short to read
    pub extend_short_segments: bool,
    /// What to do with a caption that cannot be given a positive duration
    pub fault_policy: FaultPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Keep the caption with a duration of one guard gap
    Clamp,
    /// Remove the caption from the track
    Drop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Which speech-to-text tool to run
    pub backend: TranscriberBackend,
    /// Path to the transcriber binary (`whisper` or `whisper-cli`)
    pub binary_path: String,
    /// Model name (openai-whisper) or model name/path (whisper.cpp)
    pub model: String,
    /// Source language code, or "auto" for detection
    pub source_language: String,
    /// Decoding temperature
    pub temperature: f32,
    /// Directory holding downloaded whisper.cpp models
    pub models_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriberBackend {
    /// OpenAI Whisper command-line tool, with word timestamps
    OpenaiWhisper,
    /// whisper.cpp command-line tool
    WhisperCpp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Which translation service to call
    pub backend: TranslationBackend,
    /// MyMemory API URL
    pub mymemory_url: String,
    /// Ollama endpoint URL
    pub ollama_endpoint: String,
    /// LLM model used with Ollama
    pub ollama_model: String,
    /// Language the subtitles are translated into
    pub target_language: String,
    /// Source language assumed when the transcriber reports none
    pub fallback_source_language: String,
    /// Pause between two translation requests (milliseconds)
    pub request_delay_ms: u64,
    /// HTTP timeout (seconds)
    pub timeout_secs: u64,
    /// Maximum retries for failed translations
    pub max_retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationBackend {
    MyMemory,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// How subtitles are attached to the video
    pub mux_mode: MuxMode,
    /// Additional encoding options for burned-in subtitles
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    pub subtitle_options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MuxMode {
    /// Subtitle stream muxed into the container
    Soft,
    /// Subtitles rendered into the picture
    Burn,
    /// Video and subtitle file zipped together
    Package,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Subtitle file format
    pub format: SubtitleFormat,
    /// Keep the plain subtitle file next to the muxed output
    pub keep_subtitle_file: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Srt,
    Vtt,
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
        }
    }

    /// Guess the format from a file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| SubtransError::UnsupportedFormat(path.display().to_string()))?;
        extension.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Finished jobs older than this are removed from the job store (hours)
    pub retention_hours: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_duration: 1.0,
            max_duration: 5.0,
            max_chars: 80,
            max_gap: 2.0,
            guard_gap: 0.05,
            reading_speed: 3.0,
            max_extension: 0.3,
            extend_short_segments: true,
            fault_policy: FaultPolicy::Clamp,
        }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            backend: TranscriberBackend::OpenaiWhisper,
            binary_path: "whisper".to_string(),
            model: "base".to_string(),
            source_language: "auto".to_string(),
            temperature: 0.0,
            models_dir: ".subtrans/models".to_string(),
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            backend: TranslationBackend::MyMemory,
            mymemory_url: "https://api.mymemory.translated.net/get".to_string(),
            ollama_endpoint: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2:3b".to_string(),
            target_language: "en".to_string(),
            fallback_source_language: "id".to_string(),
            request_delay_ms: 100,
            timeout_secs: 10,
            max_retries: 1,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            mux_mode: MuxMode::Soft,
            subtitle_options: vec![
                // "-preset".to_string(), "medium".to_string(),
                // "-crf".to_string(), "23".to_string(),
            ],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: SubtitleFormat::Srt,
            keep_subtitle_file: true,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self { retention_hours: 24 }
    }
}

impl FromStr for MuxMode {
    type Err = SubtransError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "soft" => Ok(Self::Soft),
            "burn" => Ok(Self::Burn),
            "package" => Ok(Self::Package),
            _ => Err(SubtransError::Config(format!(
                "Invalid mux mode '{}'. Valid modes: soft, burn, package",
                s
            ))),
        }
    }
}

impl FromStr for SubtitleFormat {
    type Err = SubtransError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(Self::Srt),
            "vtt" | "webvtt" => Ok(Self::Vtt),
            _ => Err(SubtransError::UnsupportedFormat(format!(
                "Invalid subtitle format '{}'. Valid formats: srt, vtt",
                s
            ))),
        }
    }
}

impl FromStr for FaultPolicy {
    type Err = SubtransError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "drop" => Ok(Self::Drop),
            _ => Err(SubtransError::Config(format!(
                "Invalid fault policy '{}'. Valid policies: clamp, drop",
                s
            ))),
        }
    }
}

impl FromStr for TranscriberBackend {
    type Err = SubtransError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai-whisper" | "whisper" => Ok(Self::OpenaiWhisper),
            "whisper-cpp" | "whisper.cpp" => Ok(Self::WhisperCpp),
            _ => Err(SubtransError::Config(format!(
                "Invalid transcriber backend '{}'. Valid backends: openai-whisper, whisper-cpp",
                s
            ))),
        }
    }
}

impl FromStr for TranslationBackend {
    type Err = SubtransError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mymemory" => Ok(Self::MyMemory),
            "ollama" => Ok(Self::Ollama),
            _ => Err(SubtransError::Config(format!(
                "Invalid translation backend '{}'. Valid backends: mymemory, ollama",
                s
            ))),
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("min_duration", self.min_duration),
            ("max_duration", self.max_duration),
            ("max_gap", self.max_gap),
            ("guard_gap", self.guard_gap),
            ("reading_speed", self.reading_speed),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SubtransError::Config(format!(
                    "timing.{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        if !self.max_extension.is_finite() || self.max_extension < 0.0 {
            return Err(SubtransError::Config(format!(
                "timing.max_extension must not be negative, got {}",
                self.max_extension
            )));
        }
        if self.max_chars == 0 {
            return Err(SubtransError::Config("timing.max_chars must be at least 1".to_string()));
        }
        if self.min_duration > self.max_duration {
            return Err(SubtransError::Config(format!(
                "timing.min_duration ({}) exceeds timing.max_duration ({})",
                self.min_duration, self.max_duration
            )));
        }
        Ok(())
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubtransError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| SubtransError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubtransError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubtransError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.timing.validate()?;
        if self.translate.target_language.trim().is_empty() {
            return Err(SubtransError::Config("translate.target_language must not be empty".to_string()));
        }
        Ok(())
    }
}
