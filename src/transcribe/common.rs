use std::path::Path;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SubtransError};
use crate::segment::Segment;

/// Recognizer output shared by all backends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub segments: Vec<Segment>,
    pub language: String,
    pub model_info: Option<String>,
}

impl Transcription {
    /// Full text of the transcription
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Trait for converting service-specific transcription formats
pub trait TranscriptionMapper<T> {
    fn to_transcription(service_result: T) -> Result<Transcription>;
}

/// A recognized word with its own timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct TimedWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// Phrase boundaries used when regrouping word timestamps
pub const PHRASE_MAX_CHARS: usize = 50;
pub const PHRASE_MAX_WORDS: usize = 8;

/// Regroup word-level timestamps into short phrases.
///
/// A phrase closes after a word ending in `. ! ? , ;`, once its text grows past
/// `PHRASE_MAX_CHARS`, or when it holds `PHRASE_MAX_WORDS` words. Leftover words
/// form a final phrase ending at `fallback_end` when the last word has no end.
pub fn group_words_into_phrases(words: &[TimedWord], fallback_end: f64) -> Vec<(f64, f64, String)> {
    let mut phrases = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut phrase_start: Option<f64> = None;

    for word in words {
        let text = word.text.trim();
        if text.is_empty() {
            continue;
        }

        let start = *phrase_start.get_or_insert(word.start);
        current.push(text);

        let phrase_text = current.join(" ");
        let should_end = text.ends_with(['.', '!', '?', ',', ';'])
            || phrase_text.chars().count() > PHRASE_MAX_CHARS
            || current.len() >= PHRASE_MAX_WORDS;

        if should_end {
            phrases.push((start, word.end, phrase_text));
            current.clear();
            phrase_start = None;
        }
    }

    if let Some(start) = phrase_start {
        let end = words
            .iter()
            .rev()
            .find(|w| !w.text.trim().is_empty())
            .map(|w| w.end)
            .filter(|end| end.is_finite() && *end > start)
            .unwrap_or(fallback_end);
        phrases.push((start, end, current.join(" ")));
    }

    phrases
}

/// Convert a log probability into a confidence score in [0, 1]
pub fn logprob_to_confidence(logprob: f64) -> f32 {
    (logprob.exp() as f32).clamp(0.0, 1.0)
}

/// Sort segments by start time; recognizers may emit chunks out of order
pub fn sort_by_start(segments: &mut [Segment]) {
    segments.sort_by(|a, b| a.start.total_cmp(&b.start));
}

/// Run a recognizer command and fail with its stderr on a non-zero exit
pub async fn run_recognizer(mut command: Command, description: &str) -> Result<()> {
    debug!("Executing {}: {:?}", description, command);

    let output = command
        .output()
        .await
        .map_err(|e| SubtransError::Transcription(format!("Failed to execute {}: {}", description, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SubtransError::Transcription(format!("{} failed: {}", description, stderr)));
    }

    Ok(())
}

/// Read and parse a JSON file written by a recognizer
pub async fn read_json_output<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Err(SubtransError::Transcription(format!(
            "Recognizer output not found: {}",
            path.display()
        )));
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SubtransError::Transcription(format!("Failed to read output: {}", e)))?;

    serde_json::from_str(&content)
        .map_err(|e| SubtransError::Transcription(format!("Failed to parse recognizer JSON: {}", e)))
}

/// Check whether a binary runs with the given probe argument
pub async fn probe_binary(binary_path: &str, probe_arg: &str) -> Result<()> {
    let output = Command::new(binary_path)
        .arg(probe_arg)
        .output()
        .await
        .map_err(|e| SubtransError::Transcription(format!("{} not found: {}", binary_path, e)))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(SubtransError::Transcription(format!(
            "{} is not usable: {}",
            binary_path, stderr
        )))
    }
}
