// Translation backends
//
// Backends translate one caption at a time; `translate_segments` drives them
// over a whole track:
// - MyMemory: public MyMemory HTTP API
// - Ollama: local LLM prompted for a JSON answer

pub mod common;
pub mod mymemory;
pub mod ollama;

use async_trait::async_trait;

pub use common::*;
use crate::config::{TranslateConfig, TranslationBackend};
use crate::error::Result;

/// Main trait for translation operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate a single caption text
    async fn translate(&self, text: &str, source_language: &str, target_language: &str) -> Result<String>;

    /// Check that the service can be reached
    async fn check_availability(&self) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    pub fn create_translator(config: TranslateConfig) -> Result<Box<dyn Translator>> {
        Ok(match config.backend {
            TranslationBackend::MyMemory => Box::new(mymemory::MyMemoryTranslator::new(config)?),
            TranslationBackend::Ollama => Box::new(ollama::OllamaTranslator::new(config)?),
        })
    }
}
