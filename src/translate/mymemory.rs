use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::TranslateConfig;
use crate::error::{Result, SubtransError};
use super::Translator;
use super::common::http_client;

/// Response of the MyMemory `get` endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyMemoryResponse {
    pub response_data: MyMemoryData,
    /// Numeric in successful answers, sometimes a string in error answers
    pub response_status: serde_json::Value,
    #[serde(default)]
    pub response_details: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyMemoryData {
    pub translated_text: String,
}

impl MyMemoryResponse {
    pub fn status_code(&self) -> Option<u64> {
        match &self.response_status {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Translated text if the service reports success
    pub fn into_translation(self) -> Result<String> {
        match self.status_code() {
            Some(200) => Ok(self.response_data.translated_text),
            status => Err(SubtransError::Translation(format!(
                "MyMemory returned status {:?}: {}",
                status,
                self.response_details.unwrap_or_default()
            ))),
        }
    }
}

/// Translation through the public MyMemory API
pub struct MyMemoryTranslator {
    client: Client,
    config: TranslateConfig,
}

impl MyMemoryTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(&config)?,
            config,
        })
    }
}

#[async_trait]
impl Translator for MyMemoryTranslator {
    async fn translate(&self, text: &str, source_language: &str, target_language: &str) -> Result<String> {
        let langpair = format!("{}|{}", source_language, target_language);
        debug!("MyMemory request ({}): {}", langpair, text);

        let response = self
            .client
            .get(&self.config.mymemory_url)
            .query(&[("q", text), ("langpair", langpair.as_str())])
            .send()
            .await
            .map_err(|e| SubtransError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SubtransError::Translation(format!(
                "MyMemory HTTP error {}",
                response.status()
            )));
        }

        let body: MyMemoryResponse = response
            .json()
            .await
            .map_err(|e| SubtransError::Translation(format!("Failed to parse response: {}", e)))?;

        body.into_translation()
    }

    async fn check_availability(&self) -> Result<()> {
        self.client
            .get(&self.config.mymemory_url)
            .send()
            .await
            .map_err(|e| SubtransError::Translation(format!("MyMemory is unreachable: {}", e)))?;
        info!("MyMemory API is reachable");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MyMemory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_response() {
        let json = r#"{
            "responseData": {"translatedText": "Good morning", "match": 0.98},
            "responseStatus": 200,
            "responseDetails": ""
        }"#;
        let response: MyMemoryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_translation().unwrap(), "Good morning");
    }

    #[test]
    fn test_error_status_is_rejected() {
        let json = r#"{
            "responseData": {"translatedText": "MYMEMORY WARNING: YOU USED ALL AVAILABLE FREE TRANSLATIONS"},
            "responseStatus": "429",
            "responseDetails": "quota"
        }"#;
        let response: MyMemoryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status_code(), Some(429));
        assert!(response.into_translation().is_err());
    }
}
