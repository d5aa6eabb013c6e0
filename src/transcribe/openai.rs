// OpenAI Whisper command-line implementation
//
// Runs `whisper` with word timestamps and regroups the words into short
// phrases, which track the audio much more closely than Whisper's own
// 30-second-window segments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::info;

use crate::config::TranscriberConfig;
use crate::error::{Result, SubtransError};
use crate::segment::Segment;
use super::{language_hint, Transcriber};
use super::common::{
    group_words_into_phrases, logprob_to_confidence, probe_binary, read_json_output, run_recognizer,
    sort_by_start, TimedWord, Transcription, TranscriptionMapper,
};

/// OpenAI Whisper JSON output format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIWhisperOutput {
    #[serde(default)]
    pub text: String,
    pub segments: Vec<OpenAIWhisperSegment>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIWhisperSegment {
    pub id: u64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub avg_logprob: Option<f64>,
    #[serde(default)]
    pub words: Vec<OpenAIWhisperWord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIWhisperWord {
    pub word: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
}

/// Mapper for OpenAI Whisper format
pub struct OpenAIWhisperMapper;

impl TranscriptionMapper<OpenAIWhisperOutput> for OpenAIWhisperMapper {
    fn to_transcription(whisper_output: OpenAIWhisperOutput) -> Result<Transcription> {
        let language = whisper_output.language.unwrap_or_else(|| "unknown".to_string());
        let mut segments = Vec::new();

        for seg in whisper_output.segments {
            let confidence = seg.avg_logprob.map(logprob_to_confidence);
            let make = |start: f64, end: f64, text: String| {
                let mut segment = Segment::new(start, end, text).with_language(language.clone());
                segment.confidence = confidence;
                segment
            };

            if seg.words.is_empty() {
                segments.push(make(seg.start, seg.end, seg.text.trim().to_string()));
                continue;
            }

            let words: Vec<TimedWord> = seg
                .words
                .iter()
                .map(|w| TimedWord {
                    text: w.word.clone(),
                    start: w.start,
                    end: w.end,
                })
                .collect();

            for (start, end, text) in group_words_into_phrases(&words, seg.end) {
                segments.push(make(start, end, text));
            }
        }

        sort_by_start(&mut segments);

        Ok(Transcription {
            segments,
            language,
            model_info: Some("OpenAI Whisper".to_string()),
        })
    }
}

/// OpenAI Whisper implementation
pub struct OpenAITranscriber {
    config: TranscriberConfig,
}

impl OpenAITranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transcriber for OpenAITranscriber {
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<Transcription> {
        let language = language_hint(language);
        info!(
            "Transcribing {} with OpenAI Whisper (model: {}, language: {})",
            audio_path.display(),
            self.config.model,
            language.unwrap_or("auto")
        );

        let temp_dir = tempfile::tempdir()
            .map_err(|e| SubtransError::Transcription(format!("Failed to create temp directory: {}", e)))?;
        let output_dir = temp_dir.path();

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg(audio_path)
            .arg("--model").arg(&self.config.model)
            .arg("--output_dir").arg(output_dir)
            .arg("--output_format").arg("json")
            .arg("--word_timestamps").arg("True")
            .arg("--temperature").arg(self.config.temperature.to_string());

        if let Some(lang) = language {
            cmd.arg("--language").arg(lang);
        }

        run_recognizer(cmd, "OpenAI Whisper transcription").await?;

        let audio_stem = audio_path
            .file_stem()
            .ok_or_else(|| SubtransError::Transcription("Invalid audio filename".to_string()))?;
        let json_file = output_dir.join(format!("{}.json", audio_stem.to_string_lossy()));

        let whisper_output: OpenAIWhisperOutput = read_json_output(&json_file).await?;
        let transcription = OpenAIWhisperMapper::to_transcription(whisper_output)?;

        info!(
            "Transcription completed: {} segments, language {}",
            transcription.segments.len(),
            transcription.language
        );
        Ok(transcription)
    }

    async fn check_availability(&self) -> Result<()> {
        probe_binary(&self.config.binary_path, "--help").await?;
        info!("OpenAI Whisper command-line tool is available");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }
}
