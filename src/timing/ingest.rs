use tracing::{debug, warn};

use crate::segment::{normalize_whitespace, Segment};

#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub segments: Vec<Segment>,
    pub malformed: usize,
    pub empty: usize,
}

/// Validate incoming segments before they reach the merge pass.
///
/// Segments with non-finite timestamps or `end <= start` are dropped with a
/// warning; segments whose text is empty once whitespace is normalized are
/// dropped silently. Order is left as delivered.
pub fn sanitize_segments(segments: &[Segment]) -> Ingested {
    let mut ingested = Ingested {
        segments: Vec::with_capacity(segments.len()),
        ..Ingested::default()
    };

    for (index, segment) in segments.iter().enumerate() {
        if !segment.has_valid_range() {
            warn!(
                "Dropping malformed segment #{} ({} -> {}): {:?}",
                index, segment.start, segment.end, segment.text
            );
            ingested.malformed += 1;
            continue;
        }

        let text = normalize_whitespace(&segment.text);
        if text.is_empty() {
            debug!("Dropping empty segment #{} at {}", index, segment.start);
            ingested.empty += 1;
            continue;
        }

        ingested.segments.push(Segment {
            text,
            ..segment.clone()
        });
    }

    ingested
}
