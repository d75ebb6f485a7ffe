//! Tally Core Library
//!
//! The expense intelligence engine for the Tally personal finance backend:
//! - Model store for trained artifacts (loaded once at startup, read-only)
//! - Expense categorization from free-text descriptions
//! - Fraud/anomaly scoring with heuristic overlays
//! - Next-month spending forecasts from monthly totals
//! - Offline training pipeline that produces the model artifacts
//!
//! The three inference paths are synchronous, CPU-bound, and side-effect
//! free once a [`ModelStore`] has been constructed: any number of threads
//! may share one store behind an `Arc` without coordination.

pub mod categorize;
pub mod error;
pub mod forecast;
pub mod fraud;
pub mod isolation_forest;
pub mod models;
pub mod store;
pub mod train;

pub use categorize::Categorizer;
pub use error::{Error, Result};
pub use forecast::forecast_next_month;
pub use fraud::{FraudScorer, FLAG_THRESHOLD};
pub use isolation_forest::{IsolationForest, IsolationForestParams};
pub use models::{is_flagged, FeatureVector, Forecast, CATEGORIES, UNCATEGORISED};
pub use store::{ModelStatus, ModelStore, SlotStatus};
pub use train::{TrainingConfig, TrainingPipeline, TrainingReport};
