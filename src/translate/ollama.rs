use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::config::TranslateConfig;
use crate::error::{Result, SubtransError};
use super::Translator;
use super::common::{http_client, language_code_to_name};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub text: String,
}

/// Translation through a local Ollama model
pub struct OllamaTranslator {
    client: Client,
    config: TranslateConfig,
}

impl OllamaTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(&config)?,
            config,
        })
    }

    fn build_prompt(&self, text: &str, source_language: &str, target_language: &str) -> String {
        let source_name = language_code_to_name(source_language);
        let target_name = language_code_to_name(target_language);

        format!(
            "You are a professional subtitle translator.\n\
             \n\
             Translate the following {} subtitle line to {} ONLY (language code: {}).\n\
             Keep it short enough to read on screen.\n\
             \n\
             Return ONLY the translation in JSON format as {{\"text\":\"your {} translation here\"}}.\n\
             Do not include any explanations, alternatives, or text in other languages.\n\
             \n\
             Text to translate: \"{}\"\n",
            source_name, target_name, target_language, target_name, text
        )
    }
}

/// Pick the translation out of a model answer that ignored the JSON format
pub fn clean_translation_response(response: &str) -> String {
    let lines: Vec<&str> = response.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let chatter = |line: &str| {
        line.starts_with("Here is")
            || line.starts_with("Here are")
            || line.starts_with("Option")
            || line.starts_with("**Option")
            || line.starts_with("Translation:")
            || line.starts_with("- ")
            || line.starts_with("* ")
            || (line.starts_with("**") && line.ends_with("**"))
    };

    lines
        .iter()
        .find(|line| !chatter(line) && line.chars().count() > 3)
        .or_else(|| lines.first())
        .map(|line| line.trim_matches('"').to_string())
        .unwrap_or_else(|| response.trim().to_string())
}

#[async_trait]
impl Translator for OllamaTranslator {
    async fn translate(&self, text: &str, source_language: &str, target_language: &str) -> Result<String> {
        let request = GenerateRequest {
            model: self.config.ollama_model.clone(),
            prompt: self.build_prompt(text, source_language, target_language),
            stream: false,
            format: "json".to_string(),
        };

        let url = format!("{}/api/generate", self.config.ollama_endpoint.trim_end_matches('/'));
        debug!("Sending translation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SubtransError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SubtransError::Translation(format!(
                "Ollama API error {}: {}",
                status, error_text
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SubtransError::Translation(format!("Failed to parse response: {}", e)))?;

        let raw = generated.response.trim();
        debug!("Raw Ollama response: {}", raw);

        if raw.is_empty() {
            return Err(SubtransError::Translation("Empty translation received".to_string()));
        }

        if let Ok(result) = serde_json::from_str::<TranslationResult>(raw) {
            return Ok(result.text.trim().to_string());
        }

        Ok(clean_translation_response(raw))
    }

    async fn check_availability(&self) -> Result<()> {
        let url = format!("{}/api/show", self.config.ollama_endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&json!({ "name": self.config.ollama_model }))
            .send()
            .await
            .map_err(|e| SubtransError::Translation(format!("Failed to connect to Ollama: {}", e)))?;

        if response.status().is_success() {
            info!("Ollama model '{}' is available", self.config.ollama_model);
            Ok(())
        } else {
            Err(SubtransError::Translation(format!(
                "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
                self.config.ollama_model, self.config.ollama_model
            )))
        }
    }

    fn name(&self) -> &'static str {
        "Ollama"
    }
}
