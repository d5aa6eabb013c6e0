use serde::{Deserialize, Serialize};

/// A timestamped unit of subtitle text, times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    /// Untranslated source text, kept for provenance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Source language code reported by the transcriber
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Segment {
    pub fn new<S: Into<String>>(start: f64, end: f64, text: S) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            original_text: None,
            confidence: None,
            language: None,
        }
    }

    pub fn with_original_text<S: Into<String>>(mut self, original_text: S) -> Self {
        self.original_text = Some(original_text.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_language<S: Into<String>>(mut self, language: S) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Length of the text in characters, the unit used by readability bounds
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Finite timestamps with `start < end`
    pub fn has_valid_range(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.end > self.start
    }
}

/// Collapse runs of whitespace into single spaces and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-separated words of all segments, in order.
pub fn word_sequence(segments: &[Segment]) -> Vec<&str> {
    segments
        .iter()
        .flat_map(|segment| segment.text.split_whitespace())
        .collect()
}
