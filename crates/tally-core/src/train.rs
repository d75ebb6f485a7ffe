//! Offline training pipeline
//!
//! Produces the three model artifacts the [`ModelStore`] consumes:
//! - Bag-of-words naive-Bayes categoriser, trained on a built-in labeled
//!   corpus (optionally extended with caller-supplied examples)
//! - Linear spending template, trained on synthetic monthly totals
//! - Isolation forest fraud detector, trained on synthetic transaction
//!   features
//!
//! Training is invoked out-of-band via the `tally train` admin command and
//! never runs as part of request serving. All synthetic generation is
//! seeded, so repeated runs produce identical artifacts.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::categorize::CategoryClassifier;
use crate::error::{Error, Result};
use crate::forecast::SpendingTemplate;
use crate::isolation_forest::{IsolationForest, IsolationForestParams};
use crate::models::CATEGORIES;
use crate::store::{
    default_models_dir, write_artifact, CATEGORISER_FILE, FRAUD_FILE, SPENDING_FILE,
};

/// Built-in labeled corpus for the expense categoriser. Extend with real
/// corrections via the `--corpus` CSV in production.
const CORPUS: &[(&str, &str)] = &[
    // Food & Groceries
    ("grocery shopping at walmart", "Food & Groceries"),
    ("bought vegetables and fruits from market", "Food & Groceries"),
    ("dinner at restaurant", "Food & Groceries"),
    ("lunch with colleagues", "Food & Groceries"),
    ("coffee at starbucks", "Food & Groceries"),
    ("pizza delivery dominos", "Food & Groceries"),
    ("weekly meal prep supplies", "Food & Groceries"),
    ("organic food store purchase", "Food & Groceries"),
    ("fast food mcdonalds", "Food & Groceries"),
    ("sushi takeout", "Food & Groceries"),
    ("bakery bread and pastries", "Food & Groceries"),
    ("snacks and beverages from 7-eleven", "Food & Groceries"),
    // Transportation
    ("uber ride to airport", "Transportation"),
    ("gas station fuel", "Transportation"),
    ("monthly metro pass", "Transportation"),
    ("lyft ride downtown", "Transportation"),
    ("car maintenance oil change", "Transportation"),
    ("parking fee downtown garage", "Transportation"),
    ("bus ticket", "Transportation"),
    ("toll road payment", "Transportation"),
    ("taxi cab fare", "Transportation"),
    ("car wash service", "Transportation"),
    ("train ticket amtrak", "Transportation"),
    ("flight ticket to new york", "Transportation"),
    // Entertainment
    ("netflix subscription", "Entertainment"),
    ("movie tickets amc theater", "Entertainment"),
    ("spotify premium monthly", "Entertainment"),
    ("concert tickets live nation", "Entertainment"),
    ("video game purchase steam", "Entertainment"),
    ("book purchase amazon kindle", "Entertainment"),
    ("amusement park tickets", "Entertainment"),
    ("hulu streaming service", "Entertainment"),
    ("museum admission fee", "Entertainment"),
    ("bowling night with friends", "Entertainment"),
    // Utilities
    ("electricity bill payment", "Utilities"),
    ("water bill monthly", "Utilities"),
    ("internet service provider comcast", "Utilities"),
    ("phone bill verizon", "Utilities"),
    ("gas heating bill", "Utilities"),
    ("trash collection service", "Utilities"),
    ("cell phone plan t-mobile", "Utilities"),
    ("cable tv subscription", "Utilities"),
    // Healthcare
    ("doctor visit copay", "Healthcare"),
    ("pharmacy prescription medicine", "Healthcare"),
    ("dentist cleaning appointment", "Healthcare"),
    ("health insurance premium", "Healthcare"),
    ("eye exam and glasses", "Healthcare"),
    ("gym membership monthly", "Healthcare"),
    ("therapy session counseling", "Healthcare"),
    ("vitamin supplements purchase", "Healthcare"),
    // Shopping
    ("new shoes nike store", "Shopping"),
    ("clothing purchase zara", "Shopping"),
    ("electronics best buy laptop", "Shopping"),
    ("amazon online shopping", "Shopping"),
    ("furniture ikea purchase", "Shopping"),
    ("home decor items target", "Shopping"),
    ("jewelry gift purchase", "Shopping"),
    ("cosmetics sephora", "Shopping"),
    ("sports equipment purchase", "Shopping"),
    // Housing
    ("monthly rent payment", "Housing"),
    ("mortgage payment", "Housing"),
    ("home insurance premium", "Housing"),
    ("property tax payment", "Housing"),
    ("home repair plumber", "Housing"),
    ("apartment security deposit", "Housing"),
    ("renters insurance", "Housing"),
    ("cleaning service maid", "Housing"),
    // Education
    ("tuition fee payment", "Education"),
    ("textbook purchase", "Education"),
    ("online course udemy", "Education"),
    ("school supplies", "Education"),
    ("student loan payment", "Education"),
    ("certification exam fee", "Education"),
    ("workshop registration", "Education"),
    // Income
    ("salary deposit", "Income"),
    ("freelance payment received", "Income"),
    ("refund from amazon", "Income"),
    ("cashback reward", "Income"),
    ("bank transfer received", "Income"),
    ("investment dividend", "Income"),
];

/// Configuration for the training pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Directory artifacts are written to
    pub models_dir: PathBuf,
    /// Trees in the fraud-detection ensemble
    pub n_trees: usize,
    /// Subsample size per tree
    pub sample_size: usize,
    /// Additive smoothing for the categoriser
    pub alpha: f64,
    /// Seed for synthetic data and tree construction
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            n_trees: 200,
            sample_size: 256,
            alpha: 0.1,
            seed: 42,
        }
    }
}

/// What one trained artifact was built from and where it landed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub examples: usize,
    pub path: PathBuf,
}

/// Summary of a full training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub categoriser: ModelSummary,
    pub spending: ModelSummary,
    pub fraud: ModelSummary,
}

/// Trains and persists the model artifacts
pub struct TrainingPipeline {
    config: TrainingConfig,
}

impl Default for TrainingPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingPipeline {
    pub fn new() -> Self {
        Self {
            config: TrainingConfig::default(),
        }
    }

    pub fn with_config(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train and persist all three artifacts.
    ///
    /// `extra_corpus` supplements the built-in categoriser corpus with
    /// caller-supplied `(description, category)` pairs.
    pub fn train_all(&self, extra_corpus: &[(String, String)]) -> Result<TrainingReport> {
        let categoriser = self.train_categoriser(extra_corpus)?;
        let spending = self.train_spending_template()?;
        let fraud = self.train_fraud_detector()?;
        info!("All models trained and saved");
        Ok(TrainingReport {
            categoriser,
            spending,
            fraud,
        })
    }

    /// Train the category classifier and write `categoriser.json`
    pub fn train_categoriser(&self, extra_corpus: &[(String, String)]) -> Result<ModelSummary> {
        let mut examples: Vec<(String, String)> = CORPUS
            .iter()
            .map(|(d, c)| (d.to_string(), c.to_string()))
            .collect();
        for (description, category) in extra_corpus {
            if !CATEGORIES.contains(&category.as_str()) {
                return Err(Error::Training(format!(
                    "Unknown category in corpus: {:?}",
                    category
                )));
            }
            examples.push((description.clone(), category.clone()));
        }

        let classifier = CategoryClassifier::fit(&examples, self.config.alpha)?;
        let path = self.config.models_dir.join(CATEGORISER_FILE);
        write_artifact(&path, &classifier)?;
        info!(
            examples = examples.len(),
            vocabulary = classifier.vocabulary_size(),
            path = %path.display(),
            "Categoriser trained"
        );
        Ok(ModelSummary {
            examples: examples.len(),
            path,
        })
    }

    /// Train the linear spending template and write `spending_predictor.json`
    pub fn train_spending_template(&self) -> Result<ModelSummary> {
        // 24 synthetic months of gradually increasing spending with noise
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let months: Vec<f64> = (1..=24)
            .map(|m| 1500.0 + m as f64 * 50.0 + rng.random_range(-100.0..100.0))
            .collect();

        let template = SpendingTemplate::fit(&months)?;
        let path = self.config.models_dir.join(SPENDING_FILE);
        write_artifact(&path, &template)?;
        info!(months = months.len(), path = %path.display(), "Spending template trained");
        Ok(ModelSummary {
            examples: months.len(),
            path,
        })
    }

    /// Train the fraud-detection ensemble and write `fraud_detector.json`
    pub fn train_fraud_detector(&self) -> Result<ModelSummary> {
        let data = synthetic_transactions(self.config.seed);
        let forest = IsolationForest::fit(
            &data,
            &IsolationForestParams {
                n_trees: self.config.n_trees,
                sample_size: self.config.sample_size,
                seed: self.config.seed,
            },
        )?;

        let path = self.config.models_dir.join(FRAUD_FILE);
        write_artifact(&path, &forest)?;
        info!(
            samples = data.len(),
            trees = forest.n_trees(),
            path = %path.display(),
            "Fraud detector trained"
        );
        Ok(ModelSummary {
            examples: data.len(),
            path,
        })
    }

    /// Read a labeled corpus CSV with `description,category` rows
    pub fn load_corpus(path: &Path) -> Result<Vec<(String, String)>> {
        #[derive(Deserialize)]
        struct Row {
            description: String,
            category: String,
        }

        let mut reader = csv::Reader::from_path(path)?;
        let mut examples = Vec::new();
        for row in reader.deserialize() {
            let row: Row = row?;
            if !CATEGORIES.contains(&row.category.as_str()) {
                return Err(Error::Training(format!(
                    "Unknown category in corpus {}: {:?}",
                    path.display(),
                    row.category
                )));
            }
            examples.push((row.description, row.category));
        }
        Ok(examples)
    }
}

/// Synthetic feature rows: everyday transactions plus a small set of
/// anomalous ones, matching the shape the scorer derives at call time
fn synthetic_transactions(seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(520);

    // Normal: modest amounts, descriptive text, business hours
    for _ in 0..500 {
        data.push(vec![
            rng.random_range(10.0..500.0),
            rng.random_range(10..80) as f64,
            rng.random_range(8..22) as f64,
        ]);
    }

    // Anomalous: large amounts, terse text, late night
    for _ in 0..20 {
        data.push(vec![
            rng.random_range(2000.0..10_000.0),
            rng.random_range(2..10) as f64,
            rng.random_range(0..6) as f64,
        ]);
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorize::Categorizer;
    use crate::forecast::forecast_next_month;
    use crate::fraud::FraudScorer;
    use crate::store::{ModelStore, SlotStatus};

    fn pipeline_in(dir: &Path) -> TrainingPipeline {
        TrainingPipeline::with_config(TrainingConfig {
            models_dir: dir.to_path_buf(),
            // Keep tests quick
            n_trees: 50,
            sample_size: 128,
            ..Default::default()
        })
    }

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.n_trees, 200);
        assert_eq!(config.sample_size, 256);
        assert_eq!(config.seed, 42);
        assert!((config.alpha - 0.1).abs() < 1e-9);
        assert!(config.models_dir.to_string_lossy().contains("models"));
    }

    #[test]
    fn test_corpus_categories_are_closed() {
        for (_, category) in CORPUS {
            assert!(
                CATEGORIES.contains(category),
                "corpus category {:?} not in vocabulary",
                category
            );
        }
    }

    #[test]
    fn test_train_all_produces_loadable_store() {
        let dir = tempfile::tempdir().unwrap();
        let report = pipeline_in(dir.path()).train_all(&[]).unwrap();

        assert_eq!(report.categoriser.examples, CORPUS.len());
        assert_eq!(report.spending.examples, 24);
        assert_eq!(report.fraud.examples, 520);

        let store = ModelStore::load(dir.path());
        let status = store.status();
        assert_eq!(status.categoriser, SlotStatus::Present);
        assert_eq!(status.spending, SlotStatus::Present);
        assert_eq!(status.fraud, SlotStatus::Present);
    }

    #[test]
    fn test_trained_engine_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        pipeline_in(dir.path()).train_all(&[]).unwrap();
        let store = ModelStore::load(dir.path());

        // Categoriser picks the obvious label
        let categorizer = Categorizer::new(&store);
        assert_eq!(
            categorizer.categorize("grocery shopping at walmart"),
            "Food & Groceries"
        );

        // Fraud scorer separates an obvious anomaly from a routine purchase
        let scorer = FraudScorer::new(&store);
        let routine = scorer.score_at(45.0, "weekly meal prep supplies", "acct", 13);
        let shady = scorer.score_at(8000.0, "x", "acct", 2);
        assert!(shady > routine, "shady={} routine={}", shady, routine);

        // Forecast works once the template is present
        let forecast = forecast_next_month(&store, &[1000.0, 1100.0, 1200.0, 1300.0]);
        assert!((forecast.predicted_amount - 1400.0).abs() < 1.0);
    }

    #[test]
    fn test_extra_corpus_rejects_unknown_category() {
        let dir = tempfile::tempdir().unwrap();
        let extra = vec![("llama rental".to_string(), "Livestock".to_string())];
        let err = pipeline_in(dir.path()).train_categoriser(&extra);
        assert!(err.is_err());
    }

    #[test]
    fn test_extra_corpus_extends_training_set() {
        let dir = tempfile::tempdir().unwrap();
        let extra = vec![(
            "ferry crossing ticket".to_string(),
            "Transportation".to_string(),
        )];
        let summary = pipeline_in(dir.path()).train_categoriser(&extra).unwrap();
        assert_eq!(summary.examples, CORPUS.len() + 1);
    }

    #[test]
    fn test_load_corpus_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("corpus.csv");
        std::fs::write(
            &csv_path,
            "description,category\nferry crossing,Transportation\nlate rent,Housing\n",
        )
        .unwrap();

        let examples = TrainingPipeline::load_corpus(&csv_path).unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].1, "Transportation");
    }

    #[test]
    fn test_load_corpus_rejects_bad_category() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("corpus.csv");
        std::fs::write(&csv_path, "description,category\nsomething,NotACategory\n").unwrap();
        assert!(TrainingPipeline::load_corpus(&csv_path).is_err());
    }

    #[test]
    fn test_training_is_reproducible() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        pipeline_in(dir_a.path()).train_fraud_detector().unwrap();
        pipeline_in(dir_b.path()).train_fraud_detector().unwrap();

        let a = std::fs::read_to_string(dir_a.path().join(FRAUD_FILE)).unwrap();
        let b = std::fs::read_to_string(dir_b.path().join(FRAUD_FILE)).unwrap();
        assert_eq!(a, b);
    }
}
