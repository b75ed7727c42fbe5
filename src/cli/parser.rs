//! Command-line definition.
//!
//! Global options live on [`Cli`]; each subcommand carries its own args.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::remote::Voice;

/// Photograph a car problem, hear a mechanic's diagnosis.
#[derive(Debug, Parser)]
#[command(name = "car-doctor")]
#[command(about = "Diagnose vehicle issues from a photo and hear the result")]
#[command(version)]
pub struct Cli {
    /// Read settings from this file instead of the default location
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyse a car image and speak the diagnosis
    Diagnose(DiagnoseArgs),

    /// Browse and manage saved reports
    #[command(subcommand)]
    Reports(ReportsCommand),

    /// List narration voices, or pick the default one
    Voices {
        /// Save this voice as the default in the settings file
        #[arg(long, value_name = "VOICE")]
        set: Option<Voice>,
    },
}

#[derive(Debug, Args)]
pub struct DiagnoseArgs {
    /// Path (or file:// URI) of the photo to analyse
    pub image: String,

    /// Vehicle make, model and year, e.g. "2014 Honda Civic"
    #[arg(short, long, value_name = "TEXT")]
    pub context: Option<String>,

    /// Voice for this run (alloy, echo, fable, onyx)
    #[arg(long, value_name = "VOICE")]
    pub voice: Option<Voice>,

    /// Save the narration as a report
    #[arg(long)]
    pub save: bool,

    /// Copy the narration to the clipboard
    #[arg(long)]
    pub copy: bool,

    /// Write the narration to the share file and print its path
    #[arg(long)]
    pub share: bool,

    /// Exit as soon as the narration starts instead of waiting for it
    #[arg(long)]
    pub no_audio_wait: bool,
}

#[derive(Debug, Subcommand)]
pub enum ReportsCommand {
    /// List saved reports, newest first
    List,

    /// Print one report
    Show { key: String },

    /// Delete one report
    Delete { key: String },

    /// Delete every saved report
    Clear {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },

    /// Copy a report's text to the clipboard
    Copy { key: String },

    /// Write a report's text to the share file and print its path
    Share { key: String },
}
