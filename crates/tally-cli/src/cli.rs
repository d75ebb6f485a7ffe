//! CLI argument definitions using clap
//!
//! This module contains the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - expense intelligence model administration
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Train and inspect expense intelligence models", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Model artifact directory (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub models_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn models_dir(&self) -> PathBuf {
        self.models_dir
            .clone()
            .unwrap_or_else(tally_core::store::default_models_dir)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train model artifacts
    Train {
        /// Which model to train: categoriser, spending, fraud, all
        #[arg(short, long, default_value = "all")]
        model: String,

        /// Extra labeled corpus CSV (description,category) for the categoriser
        #[arg(long)]
        corpus: Option<PathBuf>,
    },

    /// Show which model artifacts are present and loadable
    Status {
        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}
