use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::info;

use crate::config::TranscriberConfig;
use crate::error::{Result, SubtransError};
use crate::segment::Segment;
use crate::setup::resolve_model_path;
use super::{language_hint, Transcriber};
use super::common::{
    probe_binary, read_json_output, run_recognizer, sort_by_start, Transcription, TranscriptionMapper,
};

/// whisper.cpp JSON output (`-oj`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOutput {
    pub result: WhisperCppResult,
    pub transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppResult {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppSegment {
    pub offsets: WhisperCppOffsets,
    pub text: String,
}

/// Segment offsets in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOffsets {
    pub from: i64,
    pub to: i64,
}

pub struct WhisperCppMapper;

impl TranscriptionMapper<WhisperCppOutput> for WhisperCppMapper {
    fn to_transcription(whisper_output: WhisperCppOutput) -> Result<Transcription> {
        let language = whisper_output.result.language;

        let mut segments: Vec<Segment> = whisper_output
            .transcription
            .into_iter()
            .map(|seg| {
                let start = seg.offsets.from as f64 / 1000.0;
                let end = seg.offsets.to as f64 / 1000.0;
                Segment::new(start, end, seg.text.trim()).with_language(language.clone())
            })
            .collect();
        sort_by_start(&mut segments);

        Ok(Transcription {
            segments,
            language,
            model_info: Some("whisper.cpp".to_string()),
        })
    }
}

/// whisper.cpp implementation (`whisper-cli`)
pub struct WhisperCppTranscriber {
    config: TranscriberConfig,
}

impl WhisperCppTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transcriber for WhisperCppTranscriber {
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<Transcription> {
        let model_path = resolve_model_path(&self.config.models_dir, &self.config.model);
        if !model_path.exists() {
            return Err(SubtransError::Transcription(format!(
                "whisper.cpp model not found: {} (run `subtrans models --download`)",
                model_path.display()
            )));
        }

        info!(
            "Transcribing {} with whisper.cpp (model: {})",
            audio_path.display(),
            model_path.display()
        );

        let temp_dir = tempfile::tempdir()
            .map_err(|e| SubtransError::Transcription(format!("Failed to create temp directory: {}", e)))?;
        let output_prefix = temp_dir.path().join("transcript");

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg("-m").arg(&model_path)
            .arg("-f").arg(audio_path)
            .arg("-oj")
            .arg("-of").arg(&output_prefix)
            .arg("-l").arg(language_hint(language).unwrap_or("auto"))
            .arg("-tp").arg(self.config.temperature.to_string());

        run_recognizer(cmd, "whisper.cpp transcription").await?;

        let json_file = output_prefix.with_extension("json");
        let whisper_output: WhisperCppOutput = read_json_output(&json_file).await?;
        let transcription = WhisperCppMapper::to_transcription(whisper_output)?;

        info!("Transcription completed: {} segments", transcription.segments.len());
        Ok(transcription)
    }

    async fn check_availability(&self) -> Result<()> {
        probe_binary(&self.config.binary_path, "--help").await?;
        info!("whisper.cpp command-line tool is available");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "whisper.cpp"
    }
}
