// SPDX-License-Identifier: MIT OR Apache-2.0
//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Inspect, compile and preview motion timeline snapshots
#[derive(Parser, Debug)]
#[command(name = "motion_preview")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a snapshot and print its statistics as JSON
    Inspect(SnapshotArgs),

    /// Print each enabled track's normalized keyframes as JSON
    Compile(SnapshotArgs),

    /// Play a snapshot on a simulated clock and log every event
    Play(PlayArgs),

    /// Import then export a snapshot, writing the canonical form
    Normalize(NormalizeArgs),

    /// Write default preview settings
    InitSettings(InitSettingsArgs),
}

/// Arguments for commands reading one snapshot
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Snapshot JSON file
    pub snapshot: PathBuf,
}

/// Arguments for the play command
#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Snapshot JSON file
    pub snapshot: PathBuf,

    /// Preview settings (RON)
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Playback rate, overriding the settings file
    #[arg(short, long)]
    pub rate: Option<f64>,

    /// Milliseconds between ticks, overriding the settings file
    #[arg(long)]
    pub frame_interval: Option<f64>,
}

/// Arguments for the normalize command
#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Input snapshot
    pub input: PathBuf,

    /// Output path
    pub output: PathBuf,

    /// Write compact JSON instead of indented
    #[arg(long)]
    pub compact: bool,
}

/// Arguments for the init-settings command
#[derive(Args, Debug)]
pub struct InitSettingsArgs {
    /// Output path
    #[arg(default_value = "preview.ron")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

impl Cli {
    /// Default log filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn,motion_timeline=info,motion_preview=info",
            1 => "warn,motion_timeline=debug,motion_preview=debug",
            _ => "debug,motion_timeline=trace,motion_preview=trace",
        }
    }
}
