//! Tally CLI - expense intelligence model administration
//!
//! Usage:
//!   tally train                 Train and save all model artifacts
//!   tally train --model fraud   Retrain a single artifact
//!   tally status                Show which artifacts are loadable

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let models_dir = cli.models_dir();
    match cli.command {
        Commands::Train { model, corpus } => {
            commands::cmd_train(&models_dir, &model, corpus.as_deref())
        }
        Commands::Status { json } => commands::cmd_status(&models_dir, json),
    }
}
