//! Application entry point for `car-doctor`.
//!
//! # Startup sequence
//!
//! 1. Parse the command line.
//! 2. Initialise logging (`-v` raises the default filter to `debug`).
//! 3. Load [`AppConfig`](car_doctor::config::AppConfig) (defaults on first run).
//! 4. Create the tokio runtime and dispatch the subcommand.

use anyhow::Result;
use clap::Parser;

use car_doctor::cli::{handlers, Cli, CliContext, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Logging
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    // 2. Configuration
    let ctx = CliContext::load(cli.config)?;
    log::debug!("settings: {}", ctx.settings_file.display());

    // 3. Runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    rt.block_on(async move {
        match cli.command {
            Commands::Diagnose(args) => handlers::diagnose(&ctx, args).await,
            Commands::Reports(command) => handlers::reports(&ctx, command).await,
            Commands::Voices { set } => handlers::voices(&ctx, set),
        }
    })
}
