//! Artifact status command implementation

use std::path::Path;

use anyhow::Result;
use tally_core::store::{ModelStore, SlotStatus};

/// Report which model artifacts are present and loadable
pub fn cmd_status(models_dir: &Path, json: bool) -> Result<()> {
    let store = ModelStore::load(models_dir);
    let status = store.status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Model artifacts in {}", models_dir.display());
    println!("  categoriser:       {}", marker(status.categoriser));
    println!("  spending template: {}", marker(status.spending));
    println!("  fraud detector:    {}", marker(status.fraud));

    if !status.categoriser.is_present()
        || !status.spending.is_present()
        || !status.fraud.is_present()
    {
        println!();
        println!("Run `tally train` to create missing artifacts.");
    }

    Ok(())
}

fn marker(status: SlotStatus) -> String {
    let symbol = match status {
        SlotStatus::Present => "✅",
        SlotStatus::Absent => "⚠️ ",
        SlotStatus::Unreadable => "❌",
    };
    format!("{} {}", symbol, status)
}
