use crate::config::TimingConfig;
use crate::segment::Segment;
use super::TIME_EPSILON;

/// Break captions that exceed `max_chars` or `max_duration`.
///
/// Words are spread evenly over the original span (word `i` of `n` owns
/// `[start + d*i/n, start + d*(i+1)/n]`) and packed greedily into fragments.
/// Fragments share their inner boundaries and never leave the original range.
pub fn split_long_segments(segments: &[Segment], config: &TimingConfig) -> Vec<Segment> {
    let mut result = Vec::with_capacity(segments.len());

    for segment in segments {
        if segment.char_len() <= config.max_chars && segment.duration() <= config.max_duration {
            result.push(segment.clone());
        } else {
            result.extend(split_segment(segment, config));
        }
    }

    result
}

fn split_segment(segment: &Segment, config: &TimingConfig) -> Vec<Segment> {
    let words: Vec<&str> = segment.text.split_whitespace().collect();
    let word_total = words.len();
    if word_total <= 1 {
        return vec![segment.clone()];
    }

    let duration = segment.duration();
    let word_duration = duration / word_total as f64;
    let boundary = |index: usize| {
        if index >= word_total {
            segment.end
        } else {
            segment.start + duration * index as f64 / word_total as f64
        }
    };

    let mut fragments = Vec::new();
    let mut first_word = 0;
    let mut text = String::new();
    let mut text_chars = 0;

    for (index, word) in words.iter().enumerate() {
        let word_chars = word.chars().count();

        if index > first_word {
            let over_chars = text_chars + 1 + word_chars > config.max_chars;
            let over_duration =
                (index + 1 - first_word) as f64 * word_duration > config.max_duration + TIME_EPSILON;
            if over_chars || over_duration {
                fragments.push(fragment(segment, boundary(first_word), boundary(index), text));
                first_word = index;
                text = String::new();
                text_chars = 0;
            }
        }

        if !text.is_empty() {
            text.push(' ');
            text_chars += 1;
        }
        text.push_str(word);
        text_chars += word_chars;
    }

    fragments.push(fragment(segment, boundary(first_word), segment.end, text));
    fragments
}

fn fragment(source: &Segment, start: f64, end: f64, text: String) -> Segment {
    Segment {
        start,
        end,
        text,
        original_text: source.original_text.clone(),
        confidence: source.confidence,
        language: source.language.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::word_sequence;
    use approx::assert_relative_eq;

    fn config(max_chars: usize, max_duration: f64) -> TimingConfig {
        TimingConfig {
            max_chars,
            max_duration,
            ..TimingConfig::default()
        }
    }

    fn numbered_words(count: usize) -> String {
        (0..count).map(|i| format!("w{:02}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_short_segment_untouched() {
        let input = vec![Segment::new(1.0, 3.0, "short and sweet")];
        assert_eq!(split_long_segments(&input, &config(80, 5.0)), input);
    }

    #[test]
    fn test_splits_by_chars_and_partitions_range() {
        let text = numbered_words(70);
        let input = vec![Segment::new(0.0, 10.0, text).with_original_text("asal").with_confidence(0.7)];
        let split = split_long_segments(&input, &config(60, 100.0));

        assert!(split.len() >= 2);
        assert_relative_eq!(split[0].start, 0.0);
        assert_relative_eq!(split.last().unwrap().end, 10.0);
        for pair in split.windows(2) {
            assert_relative_eq!(pair[0].end, pair[1].start, epsilon = 1e-9);
        }
        for fragment in &split {
            assert!(fragment.char_len() <= 60);
            assert!(fragment.start >= 0.0 && fragment.end <= 10.0);
            assert_eq!(fragment.original_text.as_deref(), Some("asal"));
            assert_eq!(fragment.confidence, Some(0.7));
        }
        assert_eq!(word_sequence(&split), word_sequence(&input));
    }

    #[test]
    fn test_fragment_duration_proportional_to_words() {
        // 15 words of 3 chars, 60 char budget fits 15 words per fragment
        let input = vec![Segment::new(0.0, 6.0, numbered_words(30))];
        let split = split_long_segments(&input, &config(60, 100.0));

        assert_eq!(split.len(), 2);
        assert_relative_eq!(split[0].end, 3.0, epsilon = 1e-9);
        assert_relative_eq!(split[1].duration(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_splits_by_duration() {
        let input = vec![Segment::new(0.0, 12.0, "one two three four five six")];
        let split = split_long_segments(&input, &config(80, 5.0));

        assert_eq!(split.len(), 3);
        for fragment in &split {
            assert!(fragment.duration() <= 5.0 + 1e-9);
        }
        assert_eq!(split[0].text, "one two");
    }

    #[test]
    fn test_single_long_word_kept_whole() {
        let word = "x".repeat(100);
        let input = vec![Segment::new(0.0, 2.0, word.clone())];
        let split = split_long_segments(&input, &config(60, 5.0));
        assert_eq!(split.len(), 1);
        assert_eq!(split[0].text, word);
    }

    #[test]
    fn test_oversized_word_gets_own_fragment() {
        let long = "y".repeat(30);
        let input = vec![Segment::new(0.0, 3.0, format!("a {} b", long))];
        let split = split_long_segments(&input, &config(20, 5.0));
        let texts: Vec<&str> = split.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a", long.as_str(), "b"]);
    }
}
