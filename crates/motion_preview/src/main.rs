// SPDX-License-Identifier: MIT OR Apache-2.0
//! Motion Preview: headless tooling for motion timeline snapshots
//!
//! ## Usage
//!
//! ```bash
//! motion_preview inspect intro.json                    # Print stats
//! motion_preview compile intro.json                    # Print normalized keyframes
//! motion_preview play intro.json --settings preview.ron
//! motion_preview normalize intro.json intro.clean.json
//! ```

mod commands;
mod error;
mod runner;
mod settings;

use clap::Parser;
use commands::{Cli, Commands, InitSettingsArgs, NormalizeArgs, PlayArgs, SnapshotArgs};
use error::{PreviewError, Result};
use motion_timeline::{NormalizedKeyframe, TimelineSnapshot, TrackId};
use serde::Serialize;
use settings::{PreviewSettings, SETTINGS_FILE_NAME};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting motion_preview v{}", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Inspect(args) => run_inspect(&args),
        Commands::Compile(args) => run_compile(&args),
        Commands::Play(args) => run_play(&args),
        Commands::Normalize(args) => run_normalize(&args),
        Commands::InitSettings(args) => run_init_settings(&args),
    }
}

fn read_snapshot(path: &Path) -> Result<TimelineSnapshot> {
    let json = std::fs::read_to_string(path).map_err(|e| PreviewError::io(path, e))?;
    let snapshot = TimelineSnapshot::from_json(&json)?;
    tracing::debug!(
        "Read snapshot {} ({} track(s))",
        path.display(),
        snapshot.tracks.len()
    );
    Ok(snapshot)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_inspect(args: &SnapshotArgs) -> Result<()> {
    let snapshot = read_snapshot(&args.snapshot)?;
    let timeline = runner::load_timeline(&snapshot, None)?;
    print_json(&timeline.stats())
}

#[derive(Serialize)]
struct CompiledTrack {
    id: TrackId,
    name: String,
    keyframes: Vec<NormalizedKeyframe>,
}

fn run_compile(args: &SnapshotArgs) -> Result<()> {
    let snapshot = read_snapshot(&args.snapshot)?;
    let timeline = runner::load_timeline(&snapshot, None)?;

    let compiled: Vec<CompiledTrack> = timeline
        .compile()
        .into_iter()
        .map(|(id, keyframes)| CompiledTrack {
            name: timeline
                .track(&id)
                .map(|t| t.name.clone())
                .unwrap_or_default(),
            id,
            keyframes,
        })
        .collect();
    print_json(&compiled)
}

fn run_play(args: &PlayArgs) -> Result<()> {
    let local = Path::new(SETTINGS_FILE_NAME);
    let mut settings = match &args.settings {
        Some(path) => PreviewSettings::load(path)?,
        None if local.exists() => PreviewSettings::load(local)?,
        None => PreviewSettings::default(),
    };
    if let Some(rate) = args.rate {
        settings.playback_rate = rate;
    }
    if let Some(interval) = args.frame_interval {
        settings.frame_interval_ms = interval;
    }

    let snapshot = read_snapshot(&args.snapshot)?;
    let summary = runner::run_preview(&snapshot, &settings)?;
    print_json(&summary)
}

fn run_normalize(args: &NormalizeArgs) -> Result<()> {
    let snapshot = read_snapshot(&args.input)?;
    let timeline = runner::load_timeline(&snapshot, None)?;
    let normalized = timeline.export();

    let json = if args.compact {
        normalized.to_json()?
    } else {
        normalized.to_json_pretty()?
    };
    std::fs::write(&args.output, json).map_err(|e| PreviewError::io(&args.output, e))?;

    tracing::info!(
        "Wrote {} ({} track(s), {} keyframe(s))",
        args.output.display(),
        normalized.tracks.len(),
        normalized.keyframe_count()
    );
    Ok(())
}

fn run_init_settings(args: &InitSettingsArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        return Err(PreviewError::InvalidSettings(format!(
            "{} already exists (use --force to overwrite)",
            args.output.display()
        )));
    }
    PreviewSettings::default().save(&args.output)?;
    tracing::info!("Wrote default settings to {}", args.output.display());
    Ok(())
}
