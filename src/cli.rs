use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::TimingConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for the readability bounds of the timing engine
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TimingArgs {
    /// Captions shorter than this (seconds) are merged with their neighbours
    #[arg(long)]
    pub min_duration: Option<f64>,

    /// Captions longer than this (seconds) are split
    #[arg(long)]
    pub max_duration: Option<f64>,

    /// Character budget of a single caption
    #[arg(long)]
    pub max_chars: Option<usize>,

    /// Largest silence (seconds) a merge may bridge
    #[arg(long)]
    pub max_gap: Option<f64>,

    /// Do not extend merged captions for reading time
    #[arg(long)]
    pub no_extend: bool,

    /// Fault policy for captions that cannot keep a positive duration (clamp, drop)
    #[arg(long)]
    pub fault_policy: Option<String>,
}

impl TimingArgs {
    /// Apply the overrides given on the command line
    pub fn apply(&self, timing: &mut TimingConfig) -> crate::error::Result<()> {
        if let Some(value) = self.min_duration {
            timing.min_duration = value;
        }
        if let Some(value) = self.max_duration {
            timing.max_duration = value;
        }
        if let Some(value) = self.max_chars {
            timing.max_chars = value;
        }
        if let Some(value) = self.max_gap {
            timing.max_gap = value;
        }
        if self.no_extend {
            timing.extend_short_segments = false;
        }
        if let Some(policy) = &self.fault_policy {
            timing.fault_policy = policy.parse()?;
        }
        timing.validate()
    }
}

/// Options shared by `process` and `batch`
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Output directory for processed files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Language the subtitles are translated into
    #[arg(short, long)]
    pub target_lang: Option<String>,

    /// Spoken language of the video ("auto" to detect)
    #[arg(short, long)]
    pub source_lang: Option<String>,

    /// Translation backend (mymemory, ollama)
    #[arg(long)]
    pub translator: Option<String>,

    /// How subtitles are attached (soft, burn, package)
    #[arg(short, long)]
    pub mux_mode: Option<String>,

    /// Subtitle format (srt, vtt)
    #[arg(short, long)]
    pub format: Option<String>,

    #[command(flatten)]
    pub timing: TimingArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process a single video file with subtitle translation
    Process {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Process all video files in a directory
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Re-time an existing SRT or WebVTT file
    Retime {
        /// Input subtitle file
        #[arg(short, long)]
        input: PathBuf,

        /// Output subtitle file (defaults to <name>.retimed.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        timing: TimingArgs,
    },

    /// Transcribe audio to a subtitle file without translation
    Transcribe {
        /// Input audio file
        #[arg(short, long)]
        input: PathBuf,

        /// Output subtitle file (.srt or .vtt)
        #[arg(short, long)]
        output: PathBuf,

        /// Source language hint
        #[arg(short, long)]
        language: Option<String>,

        #[command(flatten)]
        timing: TimingArgs,
    },

    /// Extract audio from video file
    Extract {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output audio file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Attach a subtitle file to a video file
    Embed {
        /// Input video file
        #[arg(short, long)]
        video: PathBuf,

        /// Subtitle file
        #[arg(short, long)]
        subtitles: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// How subtitles are attached (soft, burn, package)
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// List available whisper.cpp models and their status
    Models {
        /// Download all missing models
        #[arg(long)]
        download: bool,

        /// Download only this model
        #[arg(long)]
        model: Option<String>,
    },

    /// Write a configuration file with the default settings
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FaultPolicy;

    #[test]
    fn test_parse_process_with_overrides() {
        let args = Args::try_parse_from([
            "subtrans", "process", "-i", "clip.mp4", "--target-lang", "en", "--mux-mode", "burn",
            "--max-chars", "42", "--no-extend",
        ])
        .unwrap();

        match args.command {
            Commands::Process { input, pipeline } => {
                assert_eq!(input, PathBuf::from("clip.mp4"));
                assert_eq!(pipeline.target_lang.as_deref(), Some("en"));
                assert_eq!(pipeline.mux_mode.as_deref(), Some("burn"));
                assert_eq!(pipeline.timing.max_chars, Some(42));
                assert!(pipeline.timing.no_extend);
            }
            _ => panic!("expected process command"),
        }
    }

    #[test]
    fn test_timing_args_apply() {
        let overrides = TimingArgs {
            min_duration: Some(0.8),
            fault_policy: Some("drop".to_string()),
            no_extend: true,
            ..TimingArgs::default()
        };
        let mut timing = TimingConfig::default();
        overrides.apply(&mut timing).unwrap();

        assert_eq!(timing.min_duration, 0.8);
        assert_eq!(timing.fault_policy, FaultPolicy::Drop);
        assert!(!timing.extend_short_segments);
        assert_eq!(timing.max_chars, 80);
    }

    #[test]
    fn test_timing_args_reject_invalid_bounds() {
        let overrides = TimingArgs {
            max_duration: Some(0.0),
            ..TimingArgs::default()
        };
        assert!(overrides.apply(&mut TimingConfig::default()).is_err());
    }
}
