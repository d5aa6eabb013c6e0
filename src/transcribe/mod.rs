// Speech-to-text backends
//
// Each backend runs an external recognizer and maps its JSON output onto
// `Transcription`, a list of timestamped `Segment`s sorted by start time:
// - OpenaiWhisper: OpenAI Whisper command-line tool, with word timestamps
// - WhisperCpp: whisper.cpp command-line tool
//
// To add a backend, parse its output into a service-specific struct, implement
// `TranscriptionMapper` for it, and register it in `TranscriberFactory`.

pub mod common;
pub mod openai;
pub mod whisper_cpp;

use async_trait::async_trait;
use std::path::Path;

pub use common::*;
use crate::config::{TranscriberBackend, TranscriberConfig};
use crate::error::Result;

/// Main trait for transcription operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file; "auto" lets the recognizer detect the language
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<Transcription>;

    /// Check that the recognizer binary can be executed
    async fn check_availability(&self) -> Result<()>;

    /// Human-readable backend name for logs
    fn name(&self) -> &'static str;
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create_transcriber(config: TranscriberConfig) -> Box<dyn Transcriber> {
        match config.backend {
            TranscriberBackend::OpenaiWhisper => Box::new(openai::OpenAITranscriber::new(config)),
            TranscriberBackend::WhisperCpp => Box::new(whisper_cpp::WhisperCppTranscriber::new(config)),
        }
    }
}

/// Language hint passed to the recognizer; "auto" and empty mean detection
pub fn language_hint(source_language: &str) -> Option<&str> {
    match source_language.trim() {
        "" | "auto" => None,
        language => Some(language),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_hint() {
        assert_eq!(language_hint("auto"), None);
        assert_eq!(language_hint(""), None);
        assert_eq!(language_hint("id"), Some("id"));
    }

    #[test]
    fn test_factory_selects_backend() {
        let mut config = TranscriberConfig::default();
        assert_eq!(TranscriberFactory::create_transcriber(config.clone()).name(), "OpenAI Whisper");

        config.backend = TranscriberBackend::WhisperCpp;
        assert_eq!(TranscriberFactory::create_transcriber(config).name(), "whisper.cpp");
    }
}
