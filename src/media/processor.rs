use async_trait::async_trait;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::{MediaConfig, MuxMode};
use crate::error::{Result, SubtransError};
use super::{MediaCommandBuilder, MediaProcessor};

/// Name of the instructions file inside a subtitle package
pub const PACKAGE_README: &str = "README_How_to_use_subtitles.txt";

const PACKAGE_INSTRUCTIONS: &str = "How to use the subtitles:

1. VLC Player:
   - Open the video file in VLC Player
   - Go to Subtitle > Add Subtitle File
   - Select the subtitle file

2. Other video players:
   - Most players load a subtitle file automatically when it has the
     same name as the video and sits in the same folder

3. Video editors:
   - Import both the video and the subtitle file; the captions are
     already synchronized with the audio
";

/// ffmpeg-backed media processor
pub struct FfmpegProcessor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegProcessor {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);
        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessor for FfmpegProcessor {
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());

        self.command_builder
            .extract_audio(video_path, audio_path)
            .execute()
            .await?;

        info!("Audio extraction completed");
        Ok(())
    }

    async fn attach_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
        mode: MuxMode,
    ) -> Result<PathBuf> {
        info!(
            "Attaching {} to {} ({:?}) -> {}",
            subtitle_path.display(),
            video_path.display(),
            mode,
            output_path.display()
        );

        let produced = match mode {
            MuxMode::Soft => {
                self.command_builder
                    .soft_subtitles(video_path, subtitle_path, output_path)
                    .execute()
                    .await?;
                output_path.to_path_buf()
            }
            MuxMode::Burn => {
                self.command_builder
                    .burn_subtitles(video_path, subtitle_path, output_path, &self.config.subtitle_options)
                    .execute()
                    .await?;
                output_path.to_path_buf()
            }
            MuxMode::Package => {
                let zip_path = output_path.with_extension("zip");
                let (video, subtitle, target) =
                    (video_path.to_path_buf(), subtitle_path.to_path_buf(), zip_path.clone());
                tokio::task::spawn_blocking(move || write_package(&video, &subtitle, &target))
                    .await
                    .map_err(|e| SubtransError::Media(format!("Packaging task failed: {}", e)))??;
                zip_path
            }
        };

        info!("Subtitles attached: {}", produced.display());
        Ok(produced)
    }

    async fn check_availability(&self) -> Result<()> {
        self.command_builder
            .version_check()
            .execute()
            .await
            .map_err(|e| SubtransError::Media(format!("ffmpeg is not available: {}", e)))?;
        info!("ffmpeg is available");
        Ok(())
    }

    async fn version_info(&self) -> Result<String> {
        debug!("Getting ffmpeg version information");
        let stdout = self.command_builder.version_check().execute().await?;
        Ok(stdout.lines().next().unwrap_or("Unknown version").to_string())
    }
}

/// Zip the video, its subtitle file and usage instructions together.
///
/// Entries are named after the zip file stem so players pick the subtitle up
/// automatically once extracted.
pub fn write_package(video_path: &Path, subtitle_path: &Path, zip_path: &Path) -> Result<()> {
    let stem = zip_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .ok_or_else(|| SubtransError::Media(format!("Invalid package path: {}", zip_path.display())))?;
    let entry_name = |source: &Path| match source.extension() {
        Some(ext) => format!("{}.{}", stem, ext.to_string_lossy()),
        None => stem.clone(),
    };

    let directory = match zip_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut zip = ZipWriter::new(tempfile::NamedTempFile::new_in(directory)?);
    let stored = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(true);
    let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(entry_name(video_path), stored)?;
    io::copy(&mut File::open(video_path)?, &mut zip)?;

    zip.start_file(entry_name(subtitle_path), deflated)?;
    io::copy(&mut File::open(subtitle_path)?, &mut zip)?;

    zip.start_file(PACKAGE_README, deflated)?;
    zip.write_all(PACKAGE_INSTRUCTIONS.as_bytes())?;

    zip.finish()?
        .persist(zip_path)
        .map_err(|e| SubtransError::Io(e.error))?;
    Ok(())
}
