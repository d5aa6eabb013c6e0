use tracing::debug;

use crate::config::TimingConfig;
use crate::segment::Segment;

/// Segment currently accumulating short neighbours
struct OpenSegment {
    segment: Segment,
    absorbed: usize,
}

/// Coalesce consecutive short segments into single captions.
///
/// A neighbour is absorbed only while the open caption is shorter than
/// `min_duration`, the joined text fits in `max_chars`, and the silence
/// between the two is below `max_gap`. Captions built from more than one
/// segment may then be extended towards a comfortable reading time.
pub fn merge_short_segments(segments: &[Segment], config: &TimingConfig) -> Vec<Segment> {
    let mut merged = Vec::with_capacity(segments.len());
    let mut current: Option<OpenSegment> = None;

    for segment in segments {
        current = match current.take() {
            None => Some(OpenSegment {
                segment: segment.clone(),
                absorbed: 0,
            }),
            Some(mut open) if can_join(&open.segment, segment, config) => {
                absorb(&mut open.segment, segment);
                open.absorbed += 1;
                Some(open)
            }
            Some(open) => {
                merged.push(close(open, Some(segment.start), config));
                Some(OpenSegment {
                    segment: segment.clone(),
                    absorbed: 0,
                })
            }
        };
    }

    if let Some(open) = current {
        merged.push(close(open, None, config));
    }

    merged
}

fn can_join(current: &Segment, next: &Segment, config: &TimingConfig) -> bool {
    let too_short = current.duration() < config.min_duration;
    let fits = current.char_len() + 1 + next.char_len() <= config.max_chars;
    let close_enough = next.start - current.end < config.max_gap;
    too_short && fits && close_enough
}

fn absorb(current: &mut Segment, next: &Segment) {
    current.text.push(' ');
    current.text.push_str(&next.text);
    current.end = current.end.max(next.end);

    current.original_text = match (current.original_text.take(), &next.original_text) {
        (Some(mut ours), Some(theirs)) => {
            ours.push(' ');
            ours.push_str(theirs);
            Some(ours)
        }
        (ours, theirs) => ours.or_else(|| theirs.clone()),
    };

    current.confidence = match (current.confidence, next.confidence) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
}

fn close(open: OpenSegment, next_start: Option<f64>, config: &TimingConfig) -> Segment {
    let mut segment = open.segment;
    if open.absorbed > 0 && config.extend_short_segments {
        extend_for_reading(&mut segment, next_start, config);
    }
    segment
}

/// Push `end` towards `words / reading_speed`, by at most `max_extension`
/// and never past `next_start - guard_gap`.
fn extend_for_reading(segment: &mut Segment, next_start: Option<f64>, config: &TimingConfig) {
    let comfortable = segment.word_count() as f64 / config.reading_speed;
    let deficit = comfortable - segment.duration();
    if deficit <= 0.0 {
        return;
    }

    let mut extension = deficit.min(config.max_extension);
    if let Some(next_start) = next_start {
        extension = extension.min(next_start - config.guard_gap - segment.end);
    }

    if extension > 0.0 {
        debug!(
            "Extending merged caption at {:.3}s by {:.3}s for reading time",
            segment.start, extension
        );
        segment.end += extension;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(min_duration: f64, max_chars: usize, max_gap: f64) -> TimingConfig {
        TimingConfig {
            min_duration,
            max_chars,
            max_gap,
            extend_short_segments: false,
            ..TimingConfig::default()
        }
    }

    #[test]
    fn test_merges_short_neighbours() {
        let input = vec![Segment::new(0.0, 0.5, "Hi"), Segment::new(0.6, 0.9, "there")];
        let merged = merge_short_segments(&input, &config(1.0, 60, 2.0));

        assert_eq!(merged.len(), 1);
        assert_relative_eq!(merged[0].start, 0.0);
        assert_relative_eq!(merged[0].end, 0.9);
        assert_eq!(merged[0].text, "Hi there");
    }

    #[test]
    fn test_single_segment_passes_through() {
        let input = vec![Segment::new(0.0, 0.2, "Hm").with_original_text("Hm")];
        let merged = merge_short_segments(&input, &config(1.0, 60, 2.0));
        assert_eq!(merged, input);
    }

    #[test]
    fn test_respects_char_budget() {
        let input = vec![Segment::new(0.0, 0.5, "abcde"), Segment::new(0.6, 0.9, "fghij")];
        let merged = merge_short_segments(&input, &config(1.0, 10, 2.0));
        assert_eq!(merged.len(), 2);

        let merged = merge_short_segments(&input, &config(1.0, 11, 2.0));
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_respects_gap() {
        let input = vec![Segment::new(0.0, 0.5, "one"), Segment::new(2.5, 2.9, "two")];
        let merged = merge_short_segments(&input, &config(1.0, 60, 2.0));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_long_current_is_not_merged() {
        let input = vec![Segment::new(0.0, 1.5, "long enough"), Segment::new(1.6, 1.8, "short")];
        let merged = merge_short_segments(&input, &config(1.0, 60, 2.0));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_chain_stops_once_duration_reached() {
        let input = vec![
            Segment::new(0.0, 0.4, "a"),
            Segment::new(0.5, 1.2, "b"),
            Segment::new(1.3, 1.6, "c"),
        ];
        let merged = merge_short_segments(&input, &config(1.0, 60, 2.0));
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "a b");
        assert_eq!(merged[1].text, "c");
    }

    #[test]
    fn test_merged_provenance() {
        let input = vec![
            Segment::new(0.0, 0.5, "Hi").with_original_text("Hai").with_confidence(0.9),
            Segment::new(0.6, 0.9, "there").with_original_text("di sana").with_confidence(0.4),
        ];
        let merged = merge_short_segments(&input, &config(1.0, 60, 2.0));
        assert_eq!(merged[0].original_text.as_deref(), Some("Hai di sana"));
        assert_eq!(merged[0].confidence, Some(0.4));
    }

    #[test]
    fn test_extension_is_bounded_by_next_start() {
        let mut cfg = config(1.0, 40, 2.0);
        cfg.extend_short_segments = true;
        cfg.reading_speed = 2.0;
        cfg.max_extension = 0.3;

        // four words need 2s; the caption lasts 0.9s
        let input = vec![
            Segment::new(0.0, 0.4, "one two"),
            Segment::new(0.5, 0.9, "three four"),
            Segment::new(1.0, 3.0, "a much longer following caption"),
        ];
        let merged = merge_short_segments(&input, &cfg);
        assert_eq!(merged.len(), 2);
        assert_relative_eq!(merged[0].end, 0.95, epsilon = 1e-9);

        // without a following caption the cap applies
        let merged = merge_short_segments(&input[..2], &cfg);
        assert_relative_eq!(merged[0].end, 1.2, epsilon = 1e-9);
    }

    #[test]
    fn test_unmerged_segment_is_never_extended() {
        let mut cfg = config(1.0, 80, 2.0);
        cfg.extend_short_segments = true;
        let input = vec![Segment::new(0.0, 0.3, "many words in a very short span")];
        let merged = merge_short_segments(&input, &cfg);
        assert_relative_eq!(merged[0].end, 0.3);
    }
}
