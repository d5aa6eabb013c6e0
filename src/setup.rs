use std::path::{Path, PathBuf};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::config::{TranscriberBackend, TranscriberConfig};
use crate::error::{Result, SubtransError};

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Known whisper.cpp models with their approximate download size
const KNOWN_MODELS: &[(&str, f64)] = &[
    ("tiny", 39.0),
    ("tiny.en", 39.0),
    ("base", 142.0),
    ("base.en", 142.0),
    ("small", 244.0),
    ("small.en", 244.0),
    ("medium", 769.0),
    ("medium.en", 769.0),
    ("large-v2", 1550.0),
    ("large-v3", 1550.0),
];

#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub filename: String,
    pub url: String,
    pub size_mb: f64,
}

/// Resolve a model name ("base") or explicit path to the model file location
pub fn resolve_model_path<P: AsRef<Path>>(models_dir: P, model: &str) -> PathBuf {
    if model.contains('/') || model.ends_with(".bin") {
        return PathBuf::from(model);
    }
    models_dir.as_ref().join(format!("ggml-{}.bin", model))
}

/// Downloads and lists whisper.cpp models
pub struct SetupManager {
    client: Client,
    models_dir: PathBuf,
}

impl SetupManager {
    pub fn new<P: AsRef<Path>>(models_dir: P) -> Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&models_dir)?;

        let client = Client::builder()
            .user_agent(concat!("subtrans/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, models_dir })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_available_models(&self) -> Vec<ModelInfo> {
        KNOWN_MODELS
            .iter()
            .map(|(name, size_mb)| {
                let filename = format!("ggml-{}.bin", name);
                ModelInfo {
                    name: name.to_string(),
                    url: format!("{}/{}", MODEL_BASE_URL, filename),
                    filename,
                    size_mb: *size_mb,
                }
            })
            .collect()
    }

    pub fn is_downloaded(&self, model: &ModelInfo) -> bool {
        self.models_dir.join(&model.filename).exists()
    }

    /// Make sure the configured whisper.cpp model is present, downloading it if needed
    pub async fn ensure_model(&self, config: &TranscriberConfig) -> Result<PathBuf> {
        let path = resolve_model_path(&self.models_dir, &config.model);
        if config.backend != TranscriberBackend::WhisperCpp || path.exists() {
            return Ok(path);
        }

        let models = self.get_available_models();
        match models.iter().find(|m| m.name == config.model) {
            Some(model) => self.download_model(model).await,
            None => {
                warn!("Model '{}' is not a known whisper.cpp model", config.model);
                Err(SubtransError::Config(format!(
                    "whisper.cpp model not found: {}",
                    path.display()
                )))
            }
        }
    }

    pub async fn download_model(&self, model: &ModelInfo) -> Result<PathBuf> {
        let local_path = self.models_dir.join(&model.filename);

        if local_path.exists() {
            info!("Model {} already exists at {}", model.name, local_path.display());
            return Ok(local_path);
        }

        info!("Downloading {} model ({:.1} MB)...", model.name, model.size_mb);

        let mut response = self.client.get(&model.url).send().await?;
        if !response.status().is_success() {
            return Err(SubtransError::Config(format!(
                "Failed to download model {}: HTTP {}",
                model.name,
                response.status()
            )));
        }

        let total = response
            .content_length()
            .unwrap_or((model.size_mb * 1_000_000.0) as u64);
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .map_err(|e| SubtransError::Config(format!("Invalid progress template: {}", e)))?
                .progress_chars("#>-"),
        );

        // Stream into a temporary file so an aborted download is never mistaken for a model
        let temp_path = local_path.with_extension("part");
        let mut file = async_fs::File::create(&temp_path).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            pb.inc(chunk.len() as u64);
        }
        file.flush().await?;
        drop(file);

        async_fs::rename(&temp_path, &local_path).await?;

        pb.finish_with_message(format!("Downloaded {}", model.name));
        info!("Successfully downloaded {} to {}", model.name, local_path.display());

        Ok(local_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_path() {
        assert_eq!(
            resolve_model_path("models", "base"),
            PathBuf::from("models").join("ggml-base.bin")
        );
        assert_eq!(resolve_model_path("models", "/opt/m.bin"), PathBuf::from("/opt/m.bin"));
        assert_eq!(resolve_model_path("models", "custom.bin"), PathBuf::from("custom.bin"));
    }

    #[test]
    fn test_available_models() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SetupManager::new(dir.path()).unwrap();
        let models = manager.get_available_models();

        let base = models.iter().find(|m| m.name == "base").unwrap();
        assert_eq!(base.filename, "ggml-base.bin");
        assert!(base.url.ends_with("/ggml-base.bin"));
        assert!(!manager.is_downloaded(base));

        std::fs::write(dir.path().join("ggml-base.bin"), b"model").unwrap();
        assert!(manager.is_downloaded(base));
    }

    #[tokio::test]
    async fn test_ensure_model_skips_other_backends() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SetupManager::new(dir.path()).unwrap();
        let config = TranscriberConfig::default();
        assert!(manager.ensure_model(&config).await.is_ok());
    }
}
