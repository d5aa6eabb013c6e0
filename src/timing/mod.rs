// Segment timing engine
//
// Turns raw recognizer segments into a readable, non-overlapping caption track.
// Each pass is a pure function from one segment sequence to a new one:
// - ingest: drop malformed ranges and empty text
// - merge: coalesce short neighbours, optionally extending the result for reading time
// - split: break captions that are too long or too dense
// - resolve: enforce ordering and the guard gap between captions

pub mod ingest;
pub mod merge;
pub mod split;
pub mod resolve;

use tracing::debug;

pub use ingest::sanitize_segments;
pub use merge::merge_short_segments;
pub use resolve::{resolve_overlaps, Resolution, TimingFault};
pub use split::split_long_segments;

use crate::config::TimingConfig;
use crate::error::Result;
use crate::segment::Segment;

/// Slack used when comparing timestamps produced by float arithmetic
pub(crate) const TIME_EPSILON: f64 = 1e-9;

/// Counters describing what the engine did to a track
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingReport {
    pub input_segments: usize,
    pub malformed_dropped: usize,
    pub empty_dropped: usize,
    pub after_merge: usize,
    pub after_split: usize,
    pub nudged: usize,
    pub faults: Vec<TimingFault>,
    pub output_segments: usize,
}

#[derive(Debug, Clone)]
pub struct TimingOutcome {
    pub segments: Vec<Segment>,
    pub report: TimingReport,
}

/// Runs ingest → merge → split → resolve with one set of readability bounds.
///
/// The engine holds no state besides its configuration, so a single instance
/// can be shared between jobs and called concurrently.
#[derive(Debug, Clone)]
pub struct TimingEngine {
    config: TimingConfig,
}

impl TimingEngine {
    pub fn new(config: TimingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    /// Normalize a track. Total over any input: bad segments are dropped or
    /// clamped, never reported as an error.
    pub fn process(&self, segments: &[Segment]) -> TimingOutcome {
        let ingested = sanitize_segments(segments);
        let merged = merge_short_segments(&ingested.segments, &self.config);
        let split = split_long_segments(&merged, &self.config);
        let resolution = resolve_overlaps(&split, &self.config);

        let report = TimingReport {
            input_segments: segments.len(),
            malformed_dropped: ingested.malformed,
            empty_dropped: ingested.empty,
            after_merge: merged.len(),
            after_split: split.len(),
            nudged: resolution.nudged,
            faults: resolution.faults,
            output_segments: resolution.segments.len(),
        };

        debug!(
            "Timing engine: {} in, {} malformed, {} empty, {} after merge, {} after split, {} nudged, {} faults, {} out",
            report.input_segments,
            report.malformed_dropped,
            report.empty_dropped,
            report.after_merge,
            report.after_split,
            report.nudged,
            report.faults.len(),
            report.output_segments
        );

        TimingOutcome {
            segments: resolution.segments,
            report,
        }
    }
}
