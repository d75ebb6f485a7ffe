//! Training pipeline command implementations

use std::path::Path;

use anyhow::{bail, Context, Result};
use tally_core::train::{ModelSummary, TrainingConfig, TrainingPipeline};

/// Run the offline training pipeline and write artifacts
pub fn cmd_train(models_dir: &Path, model: &str, corpus: Option<&Path>) -> Result<()> {
    let pipeline = TrainingPipeline::with_config(TrainingConfig {
        models_dir: models_dir.to_path_buf(),
        ..Default::default()
    });

    let extra = match corpus {
        Some(path) => TrainingPipeline::load_corpus(path)
            .with_context(|| format!("Failed to read corpus: {}", path.display()))?,
        None => Vec::new(),
    };
    if !extra.is_empty() {
        println!("📄 Loaded {} extra corpus examples", extra.len());
    }

    match model {
        "all" => {
            println!("🔄 Training all models...");
            let report = pipeline.train_all(&extra)?;
            print_summary("categoriser", &report.categoriser);
            print_summary("spending", &report.spending);
            print_summary("fraud", &report.fraud);
        }
        "categoriser" => print_summary("categoriser", &pipeline.train_categoriser(&extra)?),
        "spending" => {
            if corpus.is_some() {
                bail!("--corpus only applies to the categoriser");
            }
            print_summary("spending", &pipeline.train_spending_template()?)
        }
        "fraud" => {
            if corpus.is_some() {
                bail!("--corpus only applies to the categoriser");
            }
            print_summary("fraud", &pipeline.train_fraud_detector()?)
        }
        other => bail!(
            "Unknown model: {}. Valid models: categoriser, spending, fraud, all",
            other
        ),
    }

    Ok(())
}

fn print_summary(name: &str, summary: &ModelSummary) {
    println!(
        "✅ {} trained on {} examples → {}",
        name,
        summary.examples,
        summary.path.display()
    );
}
