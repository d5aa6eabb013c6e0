//! subtrans - video subtitle translation workflow
//!
//! Entry point: parses the command line, sets up logging and dispatches to
//! the workflow, the timing engine or the model manager.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use subtrans::cli::{Args, Commands, PipelineArgs};
use subtrans::config::{Config, MuxMode};
use subtrans::error::SubtransError;
use subtrans::setup::SetupManager;
use subtrans::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;
    info!("Starting subtrans {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Process { input, pipeline } => {
            apply_pipeline_args(&mut config, &pipeline)?;
            let workflow = prepare_workflow(config).await?;

            let output = workflow
                .process_single_file(&input, pipeline.output_dir.as_deref())
                .await?;
            println!("Created {}", output.output_path.display());
            if let Some(subtitle_path) = &output.subtitle_path {
                println!("Subtitles {}", subtitle_path.display());
            }
        }
        Commands::Batch { input_dir, pipeline } => {
            apply_pipeline_args(&mut config, &pipeline)?;
            let workflow = prepare_workflow(config).await?;

            let summary = workflow
                .process_directory(&input_dir, pipeline.output_dir.as_deref())
                .await?;

            println!("\nProcessed {} files, {} failed", summary.processed.len(), summary.failed.len());
            for (path, reason) in &summary.failed {
                println!("  {}: {}", path.display(), reason);
            }

            if !summary.failed.is_empty() {
                return Err(SubtransError::Job(format!("{} files failed", summary.failed.len())).into());
            }
        }
        Commands::Retime { input, output, timing } => {
            timing.apply(&mut config.timing)?;
            let workflow = Workflow::new(config)?;

            let report = workflow.retime_subtitles(&input, output.as_deref()).await?;
            println!(
                "{} cues in, {} cues out, {} nudged, {} timing faults",
                report.input_segments,
                report.output_segments,
                report.nudged,
                report.faults.len()
            );
        }
        Commands::Transcribe { input, output, language, timing } => {
            timing.apply(&mut config.timing)?;
            if let Some(language) = language {
                config.transcriber.source_language = language;
            }
            ensure_model(&config).await?;
            let workflow = Workflow::new(config)?;

            let report = workflow.transcribe_audio(&input, &output).await?;
            println!("Wrote {} cues to {}", report.output_segments, output.display());
        }
        Commands::Extract { input, output } => {
            info!("Extracting audio from: {}", input.display());
            let workflow = Workflow::new(config)?;
            workflow.extract_audio(&input, &output).await?;
        }
        Commands::Embed { video, subtitles, output, mode } => {
            info!("Attaching subtitles to video: {}", video.display());
            let mode: Option<MuxMode> = mode.map(|m| m.parse()).transpose()?;
            let workflow = Workflow::new(config)?;

            let produced = workflow.embed_subtitles(&video, &subtitles, &output, mode).await?;
            println!("Created {}", produced.display());
        }
        Commands::Models { download, model } => {
            let setup_manager = SetupManager::new(&config.transcriber.models_dir)?;
            let models = setup_manager.get_available_models();

            println!("\nAvailable whisper.cpp models ({}):", setup_manager.models_dir().display());
            println!("{:<12} {:<22} {:<10} {:<10}", "Name", "Filename", "Size (MB)", "Status");
            println!("{}", "-".repeat(56));
            for info in &models {
                let status = if setup_manager.is_downloaded(info) { "Downloaded" } else { "Missing" };
                println!("{:<12} {:<22} {:<10.1} {:<10}", info.name, info.filename, info.size_mb, status);
            }

            if let Some(name) = model {
                let info = models
                    .iter()
                    .find(|m| m.name == name)
                    .ok_or_else(|| SubtransError::Config(format!("Unknown model '{}'", name)))?;
                setup_manager.download_model(info).await?;
            } else if download {
                info!("Downloading all missing models...");
                for info in models.iter().filter(|m| !setup_manager.is_downloaded(m)) {
                    setup_manager.download_model(info).await?;
                }
                info!("All models downloaded successfully");
            }
        }
        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                return Err(SubtransError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    output.display()
                ))
                .into());
            }
            config.save_to_file(&output)?;
            println!("Wrote configuration to {}", output.display());
        }
    }

    info!("subtrans finished successfully");
    Ok(())
}

/// Fold `process`/`batch` command line options into the configuration
fn apply_pipeline_args(config: &mut Config, pipeline: &PipelineArgs) -> Result<()> {
    if let Some(target) = &pipeline.target_lang {
        config.translate.target_language = target.clone();
    }
    if let Some(source) = &pipeline.source_lang {
        config.transcriber.source_language = source.clone();
    }
    if let Some(backend) = &pipeline.translator {
        config.translate.backend = backend.parse()?;
    }
    if let Some(mode) = &pipeline.mux_mode {
        config.media.mux_mode = mode.parse()?;
    }
    if let Some(format) = &pipeline.format {
        config.output.format = format.parse()?;
    }
    pipeline.timing.apply(&mut config.timing)?;
    config.validate()?;
    Ok(())
}

/// Download the configured whisper.cpp model when it is missing
async fn ensure_model(config: &Config) -> Result<()> {
    let setup_manager = SetupManager::new(&config.transcriber.models_dir)?;
    setup_manager.ensure_model(&config.transcriber).await?;
    Ok(())
}

async fn prepare_workflow(config: Config) -> Result<Workflow> {
    ensure_model(&config).await?;
    let workflow = Workflow::new(config)?;
    workflow.check_dependencies().await?;
    Ok(workflow)
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".subtrans").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation; the guard must outlive every log call
    let file_appender = rolling::daily(&log_dir, "subtrans.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}", log_level, log_dir.join("subtrans.log").display());

    Ok(())
}
