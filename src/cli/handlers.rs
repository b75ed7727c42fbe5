//! Subcommand implementations.
//!
//! Each handler builds only the collaborators it needs from [`CliContext`],
//! prints user-facing output to stdout and progress to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use tokio::sync::{mpsc, Notify};

use crate::audio::{AudioPlaybackManager, PlaybackBackend, RodioBackend, SilentBackend};
use crate::config::{AppConfig, AppPaths};
use crate::pipeline::{FsImageLoader, SessionController, SessionEvent};
use crate::remote::{OpenAiAnalysisClient, OpenAiSpeechClient, Voice};
use crate::reports::{JsonFileStorage, Report, ReportStore};
use crate::share;

use super::parser::{DiagnoseArgs, ReportsCommand};

/// Resolved configuration shared by every subcommand.
pub struct CliContext {
    pub config: AppConfig,
    /// Where `voices --set` writes settings.
    pub settings_file: PathBuf,
    pub paths: AppPaths,
}

impl CliContext {
    /// Load settings from `override_path`, or the default location.
    pub fn load(override_path: Option<PathBuf>) -> Result<Self> {
        let paths = AppPaths::new();
        let (config, settings_file) = match override_path {
            Some(path) => {
                let config = AppConfig::load_from(&path)
                    .with_context(|| format!("failed to load {}", path.display()))?;
                (config, path)
            }
            None => (AppConfig::load()?, paths.settings_file.clone()),
        };
        Ok(Self {
            config,
            settings_file,
            paths,
        })
    }

    fn report_store(&self) -> ReportStore {
        ReportStore::new(
            Arc::new(JsonFileStorage::new(&self.paths.reports_file)),
            self.config.reports.namespace.clone(),
        )
    }
}

// ---------------------------------------------------------------------------
// diagnose
// ---------------------------------------------------------------------------

pub async fn diagnose(ctx: &CliContext, args: DiagnoseArgs) -> Result<()> {
    if ctx.config.openai.resolve_api_key().is_none() {
        bail!("no API key: set openai.api_key in the settings file or export OPENAI_API_KEY");
    }

    let (controller, events) = SessionController::new(
        Arc::new(OpenAiAnalysisClient::from_config(
            &ctx.config.openai,
            &ctx.config.analysis,
        )),
        Arc::new(OpenAiSpeechClient::from_config(
            &ctx.config.openai,
            &ctx.config.speech,
        )),
        Arc::new(FsImageLoader),
        Arc::new(ctx.report_store()),
        AudioPlaybackManager::new(output_backend()),
        args.voice.unwrap_or(ctx.config.speech.voice),
    );

    let finished = Arc::new(Notify::new());
    let printer = tokio::spawn(print_events(events, Arc::clone(&finished)));

    controller.select_image(&args.image, args.context.as_deref())?;
    controller.submit().await?;

    let narration = controller.narration().unwrap_or_default();
    println!("{narration}");

    if args.save {
        match controller.save_report().await {
            Ok(report) => eprintln!("Report saved as {}", report.key),
            Err(e) => eprintln!("{e}"),
        }
    }
    if args.copy {
        share::copy_text(&narration)?;
        eprintln!("Copied to clipboard");
    }
    if args.share {
        let path = share::export_text(&ctx.paths.cache_dir, &narration).await?;
        println!("{}", path.display());
    }

    if !args.no_audio_wait {
        eprintln!("Playing narration ({} voice), Ctrl-C to stop", controller.voice());
        tokio::select! {
            _ = finished.notified() => {}
            _ = tokio::signal::ctrl_c() => log::debug!("playback interrupted"),
        }
    }

    controller.reset();
    printer.abort();
    Ok(())
}

fn output_backend() -> Box<dyn PlaybackBackend> {
    match RodioBackend::new() {
        Ok(backend) => Box::new(backend),
        Err(e) => {
            log::warn!("{e}; narration will not be audible");
            Box::new(SilentBackend)
        }
    }
}

async fn print_events(mut events: mpsc::UnboundedReceiver<SessionEvent>, finished: Arc<Notify>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::StatusChanged { status, .. } if status.is_busy() => {
                eprintln!("{}", status.label());
            }
            SessionEvent::Advisory(advisory) => eprintln!("Tip: {}", advisory.message()),
            SessionEvent::PlaybackFinished => finished.notify_one(),
            SessionEvent::Notice(message) => eprintln!("{message}"),
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// reports
// ---------------------------------------------------------------------------

pub async fn reports(ctx: &CliContext, command: ReportsCommand) -> Result<()> {
    let store = ctx.report_store();

    match command {
        ReportsCommand::List => {
            let reports = store.list().await?;
            if reports.is_empty() {
                eprintln!("No saved reports yet.");
            }
            for report in &reports {
                println!("{}", list_line(report));
            }
        }
        ReportsCommand::Show { key } => {
            let report = require(&store, &key).await?;
            println!("{}", local_time(&report));
            println!();
            println!("{}", report.content);
        }
        ReportsCommand::Delete { key } => {
            require(&store, &key).await?;
            store.delete(&key).await?;
            eprintln!("Deleted {key}");
        }
        ReportsCommand::Clear { yes } => {
            if !yes {
                bail!("this deletes every saved report; re-run with --yes to confirm");
            }
            let count = store.clear_all().await?;
            eprintln!("Deleted {count} report(s)");
        }
        ReportsCommand::Copy { key } => {
            let report = require(&store, &key).await?;
            share::copy_text(&report.content)?;
            eprintln!("Copied to clipboard");
        }
        ReportsCommand::Share { key } => {
            let report = require(&store, &key).await?;
            let path = share::export_text(&ctx.paths.cache_dir, &report.content).await?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn require(store: &ReportStore, key: &str) -> Result<Report> {
    match store.get(key).await? {
        Some(report) => Ok(report),
        None => bail!("no report named {key}"),
    }
}

fn local_time(report: &Report) -> String {
    report
        .timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

const PREVIEW_CHARS: usize = 60;

/// `<key>  <local time>  <first line, truncated>`
fn list_line(report: &Report) -> String {
    let first = report.content.lines().next().unwrap_or("").trim();
    let mut preview: String = first.chars().take(PREVIEW_CHARS).collect();
    if first.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    format!("{}  {}  {}", report.key, local_time(report), preview)
}

// ---------------------------------------------------------------------------
// voices
// ---------------------------------------------------------------------------

pub fn voices(ctx: &CliContext, set: Option<Voice>) -> Result<()> {
    if let Some(voice) = set {
        let mut config = ctx.config.clone();
        config.speech.voice = voice;
        config
            .save_to(&ctx.settings_file)
            .with_context(|| format!("failed to write {}", ctx.settings_file.display()))?;
        eprintln!("Default voice set to {}", voice.display_name());
        return Ok(());
    }

    let current = ctx.config.speech.voice;
    for voice in Voice::ALL {
        let marker = if voice == current { "*" } else { " " };
        println!(
            "{marker} {:<6} {}  {}",
            voice.as_str(),
            voice.color(),
            voice.description()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
