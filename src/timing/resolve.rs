use tracing::warn;

use crate::config::{FaultPolicy, TimingConfig};
use crate::segment::Segment;
use super::TIME_EPSILON;

/// A caption that could not keep a positive duration after resolution
#[derive(Debug, Clone, PartialEq)]
pub struct TimingFault {
    /// Position in the sequence handed to the resolver
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub action: FaultPolicy,
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub segments: Vec<Segment>,
    /// Segments whose boundaries were moved
    pub nudged: usize,
    pub faults: Vec<TimingFault>,
}

/// Enforce strict ordering with `guard_gap` of silence between captions.
///
/// A caption starting too early is pushed to `previous.end + guard_gap`. Its
/// end stays where the audio put it unless the push swallowed the whole
/// caption, in which case the caption moves as a block; a moved end is then
/// clamped to `next.start - guard_gap`. Captions are never reordered. When no
/// positive duration remains the configured fault policy decides: `clamp`
/// keeps the caption for one guard gap, `drop` removes it.
pub fn resolve_overlaps(segments: &[Segment], config: &TimingConfig) -> Resolution {
    let guard_gap = config.guard_gap;
    let mut resolution = Resolution {
        segments: Vec::with_capacity(segments.len()),
        ..Resolution::default()
    };

    for (index, segment) in segments.iter().enumerate() {
        let mut current = segment.clone();
        let mut end_moved = false;

        if let Some(previous) = resolution.segments.last() {
            let earliest = previous.end + guard_gap;
            if current.start + TIME_EPSILON < earliest {
                let shift = earliest - current.start;
                current.start = earliest;
                if current.end <= current.start {
                    current.end += shift;
                    end_moved = true;
                }
            }
        }

        if end_moved {
            if let Some(next) = segments.get(index + 1) {
                let latest = next.start - guard_gap;
                if current.end > latest {
                    current.end = latest;
                }
            }
        }

        if current.start != segment.start || current.end != segment.end {
            resolution.nudged += 1;
        }

        if current.end - current.start <= TIME_EPSILON {
            warn!(
                "Caption #{} cannot keep a positive duration ({:.3} -> {:.3}), applying {:?}",
                index, current.start, current.end, config.fault_policy
            );
            resolution.faults.push(TimingFault {
                index,
                start: current.start,
                end: current.end,
                text: current.text.clone(),
                action: config.fault_policy,
            });
            match config.fault_policy {
                FaultPolicy::Clamp => current.end = current.start + guard_gap,
                FaultPolicy::Drop => continue,
            }
        }

        resolution.segments.push(current);
    }

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(policy: FaultPolicy) -> TimingConfig {
        TimingConfig {
            fault_policy: policy,
            ..TimingConfig::default()
        }
    }

    #[test]
    fn test_pushes_overlapping_start() {
        let input = vec![Segment::new(1.0, 3.0, "A"), Segment::new(2.5, 4.0, "B")];
        let resolved = resolve_overlaps(&input, &config(FaultPolicy::Clamp));

        assert_eq!(resolved.segments.len(), 2);
        assert_eq!(resolved.segments[0], input[0]);
        assert_relative_eq!(resolved.segments[1].start, 3.05, epsilon = 1e-9);
        assert_relative_eq!(resolved.segments[1].end, 4.0);
        assert_eq!(resolved.nudged, 1);
        assert!(resolved.faults.is_empty());
    }

    #[test]
    fn test_enforces_gap_between_touching_captions() {
        let input = vec![Segment::new(0.0, 2.0, "a"), Segment::new(2.0, 4.0, "b")];
        let resolved = resolve_overlaps(&input, &config(FaultPolicy::Clamp));
        assert_relative_eq!(resolved.segments[1].start, 2.05, epsilon = 1e-9);
        assert_relative_eq!(resolved.segments[1].end, 4.0);
    }

    #[test]
    fn test_swallowed_caption_moves_as_block() {
        let input = vec![
            Segment::new(0.0, 5.0, "long"),
            Segment::new(1.0, 2.0, "inside"),
            Segment::new(9.0, 10.0, "later"),
        ];
        let resolved = resolve_overlaps(&input, &config(FaultPolicy::Clamp));
        assert_relative_eq!(resolved.segments[1].start, 5.05, epsilon = 1e-9);
        assert_relative_eq!(resolved.segments[1].end, 6.05, epsilon = 1e-9);
        assert_eq!(resolved.segments[2], input[2]);
    }

    #[test]
    fn test_moved_end_clamped_to_next_start() {
        let input = vec![
            Segment::new(0.0, 5.0, "long"),
            Segment::new(1.0, 2.0, "inside"),
            Segment::new(5.5, 7.0, "next"),
        ];
        let resolved = resolve_overlaps(&input, &config(FaultPolicy::Clamp));
        assert_relative_eq!(resolved.segments[1].end, 5.45, epsilon = 1e-9);
        assert_eq!(resolved.segments[2], input[2]);
    }

    #[test]
    fn test_degenerate_caption_clamped() {
        let input = vec![
            Segment::new(0.0, 5.0, "long"),
            Segment::new(1.0, 2.0, "inside"),
            Segment::new(5.0, 7.0, "next"),
        ];
        let resolved = resolve_overlaps(&input, &config(FaultPolicy::Clamp));

        assert_eq!(resolved.faults.len(), 1);
        assert_eq!(resolved.faults[0].index, 1);
        assert_eq!(resolved.segments.len(), 3);
        let inside = &resolved.segments[1];
        assert_relative_eq!(inside.start, 5.05, epsilon = 1e-9);
        assert_relative_eq!(inside.end, 5.10, epsilon = 1e-9);
        assert!(resolved.segments[2].start >= inside.end + 0.05 - 1e-9);
    }

    #[test]
    fn test_degenerate_caption_dropped() {
        let input = vec![
            Segment::new(0.0, 5.0, "long"),
            Segment::new(1.0, 2.0, "inside"),
            Segment::new(5.0, 7.0, "next"),
        ];
        let resolved = resolve_overlaps(&input, &config(FaultPolicy::Drop));

        assert_eq!(resolved.faults.len(), 1);
        assert_eq!(resolved.faults[0].action, FaultPolicy::Drop);
        let texts: Vec<&str> = resolved.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["long", "next"]);
        assert_relative_eq!(resolved.segments[1].start, 5.05, epsilon = 1e-9);
    }

    #[test]
    fn test_valid_track_untouched() {
        let input = vec![
            Segment::new(0.0, 1.0, "a"),
            Segment::new(1.5, 2.5, "b"),
            Segment::new(3.0, 4.0, "c"),
        ];
        let resolved = resolve_overlaps(&input, &config(FaultPolicy::Clamp));
        assert_eq!(resolved.segments, input);
        assert_eq!(resolved.nudged, 0);
    }
}
