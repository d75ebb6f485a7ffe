//! Shared domain types for the expense intelligence engine

use serde::{Deserialize, Serialize};

/// Sentinel label returned when no classifier is loaded
pub const UNCATEGORISED: &str = "Uncategorised";

/// The closed expense-category vocabulary the classifier is trained on.
///
/// The categorizer never returns a label outside this list (other than
/// [`UNCATEGORISED`] when no model is available).
pub const CATEGORIES: [&str; 9] = [
    "Food & Groceries",
    "Transportation",
    "Entertainment",
    "Utilities",
    "Healthcare",
    "Shopping",
    "Housing",
    "Education",
    "Income",
];

/// Fixed decision boundary above which a fraud score becomes a flag
pub const FLAG_THRESHOLD: f64 = 0.65;

/// Whether a fraud score crosses the flag threshold
pub fn is_flagged(score: f64) -> bool {
    score > FLAG_THRESHOLD
}

/// The numeric features the anomaly ensemble scores a transaction on.
///
/// Derived per call from caller-supplied fields and the wall-clock hour;
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    /// Transaction amount (non-negative)
    pub amount: f64,
    /// Length of the free-text description in characters
    pub description_length: usize,
    /// Hour of day in 0..=23 (UTC)
    pub hour_of_day: u32,
}

impl FeatureVector {
    pub fn new(amount: f64, description: &str, hour_of_day: u32) -> Self {
        Self {
            amount,
            description_length: description.chars().count(),
            hour_of_day,
        }
    }

    /// Feature order must match what the fraud detector was trained on.
    pub fn as_row(&self) -> Vec<f64> {
        vec![
            self.amount,
            self.description_length as f64,
            self.hour_of_day as f64,
        ]
    }
}

/// A next-month spending estimate with a fit-quality confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Predicted spending for the next month (never negative)
    pub predicted_amount: f64,
    /// R² of the linear fit against the supplied points (floored at 0)
    pub confidence: f64,
}

impl Forecast {
    /// Sentinel returned when no forecast can be made
    pub fn zero() -> Self {
        Self {
            predicted_amount: 0.0,
            confidence: 0.0,
        }
    }
}
