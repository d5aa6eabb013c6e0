use std::sync::LazyLock;
use std::time::Duration;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::TranslateConfig;
use crate::error::{Result, SubtransError};
use crate::segment::Segment;
use super::Translator;

/// Texts shorter than this (in characters) are returned untranslated
pub const MIN_TRANSLATABLE_CHARS: usize = 3;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*?\]").expect("valid regex"));
static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*?\)").expect("valid regex"));
static REPEATED_DOTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{2,}").expect("valid regex"));
static REPEATED_BANGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!{2,}").expect("valid regex"));
static REPEATED_QUESTIONS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\?{2,}").expect("valid regex"));

/// Strip recognizer artifacts before a caption is sent for translation.
///
/// Collapses whitespace, removes `[...]` and `(...)` annotations such as
/// `[music]`, and collapses runs of `.`, `!` and `?`.
pub fn clean_text(text: &str) -> String {
    let text = WHITESPACE.replace_all(text, " ");
    let text = BRACKETED.replace_all(&text, "");
    let text = PARENTHESIZED.replace_all(&text, "");
    let text = REPEATED_DOTS.replace_all(&text, ".");
    let text = REPEATED_BANGS.replace_all(&text, "!");
    let text = REPEATED_QUESTIONS.replace_all(&text, "?");
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Build the HTTP client shared by the translation backends
pub fn http_client(config: &TranslateConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| SubtransError::Translation(format!("Failed to create HTTP client: {}", e)))
}

/// Translate every segment into the configured target language.
///
/// Timing is left untouched; the source text is kept in `original_text`.
/// Segments already in the target language are copied, segments whose text is
/// empty after cleaning are dropped, and a failed request keeps the source text.
pub async fn translate_segments(
    translator: &dyn Translator,
    segments: &[Segment],
    config: &TranslateConfig,
) -> Vec<Segment> {
    let target = config.target_language.as_str();
    let delay = Duration::from_millis(config.request_delay_ms);
    let mut translated = Vec::with_capacity(segments.len());
    let mut requests = 0usize;
    let mut failures = 0usize;

    info!(
        "Translating {} segments to {} with {}",
        segments.len(),
        target,
        translator.name()
    );

    for segment in segments {
        let source = match segment.language.as_deref().map(str::trim) {
            Some(language) if !matches!(language, "" | "auto" | "unknown") => language,
            _ => config.fallback_source_language.as_str(),
        };

        if source == target {
            translated.push(segment.clone().with_original_text(segment.text.clone()));
            continue;
        }

        let text = clean_text(&segment.text);
        if text.is_empty() {
            debug!("Skipping segment at {:.2}s: empty after cleaning", segment.start);
            continue;
        }

        let result = if text.chars().count() < MIN_TRANSLATABLE_CHARS {
            None
        } else {
            if requests > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            requests += 1;

            match translate_with_retries(translator, &text, source, target, config.max_retries).await {
                Ok(output) if !output.trim().is_empty() => Some(output.trim().to_string()),
                Ok(_) => {
                    failures += 1;
                    warn!("Empty translation for segment at {:.2}s, keeping source text", segment.start);
                    None
                }
                Err(e) => {
                    failures += 1;
                    warn!("Translation failed for segment at {:.2}s: {}", segment.start, e);
                    None
                }
            }
        };

        // Untranslated captions keep their cleaned text and source language
        let mut out = segment.clone().with_original_text(segment.text.clone());
        match result {
            Some(translation) => {
                out.text = translation;
                out.language = Some(target.to_string());
            }
            None => out.text = text,
        }
        translated.push(out);
    }

    info!(
        "Translation finished: {} segments, {} requests, {} failures",
        translated.len(),
        requests,
        failures
    );
    translated
}

async fn translate_with_retries(
    translator: &dyn Translator,
    text: &str,
    source: &str,
    target: &str,
    max_retries: u32,
) -> Result<String> {
    let mut attempt = 0;
    loop {
        match translator.translate(text, source, target).await {
            Ok(output) => return Ok(output),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                debug!("Translation attempt {} failed: {}; retrying", attempt, e);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Convert language code to full language name for clearer prompts
pub fn language_code_to_name(code: &str) -> String {
    let name = match code.to_lowercase().as_str() {
        "en" => "English",
        "id" => "Indonesian",
        "ms" => "Malay",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "ru" => "Russian",
        "it" => "Italian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "tr" => "Turkish",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "th" => "Thai",
        "vi" => "Vietnamese",
        "tl" => "Tagalog",
        "pl" => "Polish",
        "sv" => "Swedish",
        "uk" => "Ukrainian",
        _ => return code.to_string(),
    };
    name.to_string()
}
