use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::{Config, MuxMode, SubtitleFormat};
use crate::error::{Result, SubtransError};
use crate::jobs::{progress, JobStore};
use crate::media::{MediaProcessor, MediaProcessorFactory};
use crate::segment::Segment;
use crate::subtitle::{read_subtitles, write_subtitles};
use crate::timing::{TimingEngine, TimingReport};
use crate::transcribe::{Transcriber, TranscriberFactory};
use crate::translate::{translate_segments, Translator, TranslatorFactory};

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

pub fn is_video_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Files produced for one video
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub job_id: Uuid,
    pub output_path: PathBuf,
    /// Absent when the plain subtitle file is not kept
    pub subtitle_path: Option<PathBuf>,
    pub report: TimingReport,
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub processed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

pub struct Workflow {
    config: Config,
    transcriber: Box<dyn Transcriber>,
    translator: Box<dyn Translator>,
    media: Box<dyn MediaProcessor>,
    engine: TimingEngine,
    jobs: JobStore,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let transcriber = TranscriberFactory::create_transcriber(config.transcriber.clone());
        let translator = TranslatorFactory::create_translator(config.translate.clone())?;
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        Self::with_components(config, transcriber, translator, media)
    }

    /// Build a workflow around explicit collaborators
    pub fn with_components(
        config: Config,
        transcriber: Box<dyn Transcriber>,
        translator: Box<dyn Translator>,
        media: Box<dyn MediaProcessor>,
    ) -> Result<Self> {
        let engine = TimingEngine::new(config.timing.clone())?;
        let jobs = JobStore::with_retention(chrono::Duration::hours(config.jobs.retention_hours as i64));
        Ok(Self {
            config,
            transcriber,
            translator,
            media,
            engine,
            jobs,
        })
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    pub fn engine(&self) -> &TimingEngine {
        &self.engine
    }

    /// Fail early when an external tool the full pipeline needs is missing.
    ///
    /// An unreachable translation service is only logged: captions then keep
    /// their source text.
    pub async fn check_dependencies(&self) -> Result<()> {
        self.media.check_availability().await?;
        match self.media.version_info().await {
            Ok(version) => info!("Using {}", version),
            Err(e) => warn!("Could not read media tool version: {}", e),
        }
        self.transcriber.check_availability().await?;
        if let Err(e) = self.translator.check_availability().await {
            warn!("{} is not available, captions will stay untranslated: {}", self.translator.name(), e);
        }
        Ok(())
    }

    /// Process a single video file into a subtitled output
    pub async fn process_single_file<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_dir: Option<&Path>,
    ) -> Result<ProcessOutput> {
        let input_path = input_path.as_ref();
        info!("Processing single file: {}", input_path.display());

        if !input_path.exists() {
            return Err(SubtransError::FileNotFound(input_path.display().to_string()));
        }

        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => input_path
                .parent()
                .ok_or_else(|| SubtransError::Config("Cannot determine output directory".to_string()))?
                .to_path_buf(),
        };
        fs::create_dir_all(&output_dir).await?;

        let job_id = self.jobs.create(input_path)?;
        match self.process_video_file(job_id, input_path, &output_dir).await {
            Ok(output) => Ok(output),
            Err(e) => {
                self.jobs.fail(job_id, &e.to_string())?;
                Err(e)
            }
        }
    }

    /// Process all video files below a directory; one failing file does not stop the batch
    pub async fn process_directory<P: AsRef<Path>>(
        &self,
        input_dir: P,
        output_dir: Option<&Path>,
    ) -> Result<BatchSummary> {
        let input_dir = input_dir.as_ref();
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(SubtransError::Config(format!(
                "Input path is not a directory: {}",
                input_dir.display()
            )));
        }

        let output_dir = output_dir.unwrap_or(input_dir);

        let mut video_files: Vec<PathBuf> = WalkDir::new(input_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_video_file(e.path()))
            .map(|e| e.into_path())
            .collect();
        video_files.sort();

        info!("Found {} video files to process", video_files.len());

        let mut summary = BatchSummary::default();
        for video_path in video_files {
            match self.process_single_file(&video_path, Some(output_dir)).await {
                Ok(output) => {
                    info!("Successfully processed: {} -> {}", video_path.display(), output.output_path.display());
                    summary.processed.push(video_path);
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", video_path.display(), e);
                    summary.failed.push((video_path, e.to_string()));
                }
            }
        }

        info!(
            "Batch finished: {} processed, {} failed",
            summary.processed.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    async fn process_video_file(&self, job_id: Uuid, video_path: &Path, output_dir: &Path) -> Result<ProcessOutput> {
        let video_stem = video_path
            .file_stem()
            .ok_or_else(|| SubtransError::Config("Invalid video filename".to_string()))?
            .to_string_lossy()
            .to_string();
        let target = &self.config.translate.target_language;

        self.jobs.update(job_id, 0, "Extracting audio...")?;
        let work_dir = tempfile::tempdir()?;
        let audio_path = work_dir.path().join(format!("{}.wav", video_stem));
        self.media.extract_audio(video_path, &audio_path).await?;

        self.jobs.update(job_id, progress::EXTRACTED, "Transcribing audio...")?;
        let transcription = self
            .transcriber
            .transcribe(&audio_path, &self.config.transcriber.source_language)
            .await?;
        info!(
            "Transcribed {} segments (language: {})",
            transcription.segments.len(),
            transcription.language
        );

        self.jobs.update(job_id, progress::TRANSCRIBED, "Translating...")?;
        let translated = translate_segments(self.translator.as_ref(), &transcription.segments, &self.config.translate).await;

        self.jobs.update(job_id, progress::TRANSLATED, "Adjusting subtitle timing...")?;
        let outcome = self.engine.process(&translated);
        log_report(&outcome.report);

        self.jobs.update(job_id, progress::RETIMED, "Writing subtitles...")?;
        let format = self.config.output.format;
        let subtitle_path = output_dir.join(format!("{}_{}.{}", video_stem, target, format.extension()));
        write_subtitles(&outcome.segments, format, &subtitle_path).await?;

        self.jobs.update(job_id, progress::SUBTITLES_WRITTEN, "Attaching subtitles...")?;
        let extension = video_path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "mp4".to_string());
        let output_path = output_dir.join(format!("{}_{}.{}", video_stem, target, extension));
        let produced = self
            .media
            .attach_subtitles(video_path, &subtitle_path, &output_path, self.config.media.mux_mode)
            .await?;

        self.jobs.update(job_id, progress::ATTACHED, "Finishing...")?;
        let mut outputs = vec![produced.clone()];
        let kept_subtitle = if self.config.output.keep_subtitle_file {
            outputs.push(subtitle_path.clone());
            Some(subtitle_path)
        } else {
            fs::remove_file(&subtitle_path).await?;
            None
        };

        self.jobs.complete(job_id, outputs)?;
        Ok(ProcessOutput {
            job_id,
            output_path: produced,
            subtitle_path: kept_subtitle,
            report: outcome.report,
        })
    }

    /// Re-run the timing engine over an existing subtitle file.
    ///
    /// Without an explicit output the result is written next to the input as
    /// `<stem>.retimed.<ext>`; the output format follows the output extension.
    pub async fn retime_subtitles<P: AsRef<Path>>(&self, input_path: P, output_path: Option<&Path>) -> Result<TimingReport> {
        let input_path = input_path.as_ref();
        let segments = read_subtitles(input_path).await?;
        info!("Read {} cues from {}", segments.len(), input_path.display());

        let output_path = match output_path {
            Some(path) => path.to_path_buf(),
            None => {
                let extension = SubtitleFormat::from_path(input_path)?.extension();
                input_path.with_extension(format!("retimed.{}", extension))
            }
        };

        self.write_retimed(&segments, &output_path).await
    }

    /// Transcribe an audio file straight into a subtitle file, without translation
    pub async fn transcribe_audio<P: AsRef<Path>>(&self, audio_path: P, output_path: &Path) -> Result<TimingReport> {
        let audio_path = audio_path.as_ref();
        if !audio_path.exists() {
            return Err(SubtransError::FileNotFound(audio_path.display().to_string()));
        }

        let transcription = self
            .transcriber
            .transcribe(audio_path, &self.config.transcriber.source_language)
            .await?;
        self.write_retimed(&transcription.segments, output_path).await
    }

    pub async fn extract_audio<P: AsRef<Path>>(&self, video_path: P, audio_path: &Path) -> Result<()> {
        let video_path = video_path.as_ref();
        if !video_path.exists() {
            return Err(SubtransError::FileNotFound(video_path.display().to_string()));
        }
        self.media.extract_audio(video_path, audio_path).await
    }

    /// Attach an existing subtitle file to a video
    pub async fn embed_subtitles<P: AsRef<Path>>(
        &self,
        video_path: P,
        subtitle_path: &Path,
        output_path: &Path,
        mode: Option<MuxMode>,
    ) -> Result<PathBuf> {
        let video_path = video_path.as_ref();
        for path in [video_path, subtitle_path] {
            if !path.exists() {
                return Err(SubtransError::FileNotFound(path.display().to_string()));
            }
        }
        let mode = mode.unwrap_or(self.config.media.mux_mode);
        self.media.attach_subtitles(video_path, subtitle_path, output_path, mode).await
    }

    async fn write_retimed(&self, segments: &[Segment], output_path: &Path) -> Result<TimingReport> {
        let format = SubtitleFormat::from_path(output_path)?;
        let outcome = self.engine.process(segments);
        log_report(&outcome.report);
        write_subtitles(&outcome.segments, format, output_path).await?;
        Ok(outcome.report)
    }
}

fn log_report(report: &TimingReport) {
    info!(
        "Timing: {} segments in, {} out ({} merged away, {} nudged, {} faults)",
        report.input_segments,
        report.output_segments,
        report
            .input_segments
            .saturating_sub(report.malformed_dropped + report.empty_dropped + report.after_merge),
        report.nudged,
        report.faults.len()
    );
    if report.malformed_dropped > 0 {
        warn!("{} malformed segments were dropped", report.malformed_dropped);
    }
}
