// Media processing
//
// ffmpeg does the work; `MediaCommandBuilder` assembles its invocations and
// `FfmpegProcessor` runs them behind the `MediaProcessor` trait.

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use commands::*;
pub use processor::*;

use crate::config::{MediaConfig, MuxMode};
use crate::error::Result;

/// Main trait for media processing operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Extract a mono 16 kHz WAV track from a video
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()>;

    /// Attach a subtitle file to a video; returns the path actually produced
    /// (the zip archive in package mode)
    async fn attach_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
        mode: MuxMode,
    ) -> Result<PathBuf>;

    async fn check_availability(&self) -> Result<()>;

    /// First line of the tool's version banner
    async fn version_info(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessor> {
        Box::new(processor::FfmpegProcessor::new(config))
    }
}
