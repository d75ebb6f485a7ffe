//! Fraud/anomaly scoring for transactions
//!
//! Blends a learned anomaly signal (isolation forest over amount,
//! description length, and hour of day) with a fixed table of heuristic
//! overlay rules. The overlays are additive and order-independent; the
//! final score is always clamped to [0, 1]. Callers derive the actionable
//! flag with [`is_flagged`](crate::models::is_flagged) against
//! [`FLAG_THRESHOLD`](crate::models::FLAG_THRESHOLD).

use chrono::{Timelike, Utc};
use tracing::debug;

use crate::models::FeatureVector;
use crate::store::ModelStore;

pub use crate::models::{is_flagged, FLAG_THRESHOLD};

/// One heuristic adjustment applied on top of the learned base probability
struct Overlay {
    name: &'static str,
    boost: f64,
    applies: fn(&FeatureVector) -> bool,
}

/// The fixed overlay table. Each rule is additive; the sum is clamped to
/// [0, 1] after all rules have been applied.
const OVERLAYS: [Overlay; 3] = [
    Overlay {
        name: "large_amount",
        boost: 0.15,
        applies: |fv| fv.amount > 5000.0,
    },
    Overlay {
        name: "terse_description",
        boost: 0.10,
        applies: |fv| fv.description_length < 5,
    },
    Overlay {
        name: "late_night",
        boost: 0.08,
        applies: |fv| fv.hour_of_day < 5,
    },
];

/// Fraud scoring inference component.
///
/// Borrows the model store read-only; safe for unlimited concurrent
/// callers.
pub struct FraudScorer<'a> {
    store: &'a ModelStore,
}

impl<'a> FraudScorer<'a> {
    pub fn new(store: &'a ModelStore) -> Self {
        Self { store }
    }

    /// Fraud probability in [0, 1] for a transaction, using the current
    /// UTC hour for the time-of-day feature.
    ///
    /// `account_id` is accepted for future per-account personalization but
    /// does not affect the current computation.
    pub fn score(&self, amount: f64, description: &str, account_id: &str) -> f64 {
        self.score_at(amount, description, account_id, Utc::now().hour())
    }

    /// [`score`](Self::score) with an explicit hour of day (0..=23).
    /// Deterministic given a fixed model store and inputs.
    pub fn score_at(
        &self,
        amount: f64,
        description: &str,
        account_id: &str,
        hour_of_day: u32,
    ) -> f64 {
        let forest = match self.store.anomaly() {
            Some(f) => f,
            None => return 0.0,
        };

        let features = FeatureVector::new(amount, description, hour_of_day);

        // Isolation forest decision values are negative for anomalies;
        // 0.5 - decision maps that to a probability-like base score.
        let decision = forest.decision_function(&features.as_row());
        let base = (0.5 - decision).clamp(0.0, 1.0);

        let mut score = base;
        for overlay in &OVERLAYS {
            if (overlay.applies)(&features) {
                debug!(
                    account_id,
                    rule = overlay.name,
                    boost = overlay.boost,
                    "Fraud overlay applied"
                );
                score += overlay.boost;
            }
        }

        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isolation_forest::{IsolationForest, IsolationForestParams};

    /// Forest trained on everyday transactions so that extreme points
    /// actually score as anomalous
    fn store_with_forest() -> ModelStore {
        let mut data = Vec::new();
        for i in 0..300 {
            let amount = 10.0 + (i as f64 * 1.63) % 490.0;
            let desc_len = 10.0 + (i as f64 * 2.41) % 70.0;
            let hour = 8.0 + (i % 14) as f64;
            data.push(vec![amount, desc_len, hour]);
        }
        let forest = IsolationForest::fit(
            &data,
            &IsolationForestParams {
                n_trees: 100,
                sample_size: 128,
                seed: 42,
            },
        )
        .unwrap();
        ModelStore::from_parts(None, None, Some(forest))
    }

    #[test]
    fn test_no_model_scores_zero() {
        let store = ModelStore::empty();
        let scorer = FraudScorer::new(&store);
        assert_eq!(scorer.score_at(9999.0, "x", "acct-1", 2), 0.0);
        assert_eq!(scorer.score_at(0.0, "regular grocery purchase", "acct-1", 12), 0.0);
    }

    #[test]
    fn test_score_bounded_over_input_grid() {
        let store = store_with_forest();
        let scorer = FraudScorer::new(&store);

        for amount in [0.0, 4.99, 120.0, 5000.0, 5000.01, 1_000_000.0] {
            for description in ["", "atm", "grocery shopping at walmart", &"x".repeat(500)] {
                for hour in [0, 4, 5, 12, 23] {
                    let score = scorer.score_at(amount, description, "acct-1", hour);
                    assert!(
                        (0.0..=1.0).contains(&score),
                        "score {} out of bounds for amount={} desc_len={} hour={}",
                        score,
                        amount,
                        description.len(),
                        hour
                    );
                }
            }
        }
    }

    #[test]
    fn test_large_amount_overlay_monotonic() {
        let store = store_with_forest();
        let scorer = FraudScorer::new(&store);

        // Same description and hour; crossing the 5000 boundary must not
        // lower the score.
        let below = scorer.score_at(4999.0, "electronics purchase online", "a", 12);
        let above = scorer.score_at(5001.0, "electronics purchase online", "a", 12);
        assert!(above >= below, "above={} below={}", above, below);
    }

    #[test]
    fn test_terse_description_overlay_monotonic() {
        let store = store_with_forest();
        let scorer = FraudScorer::new(&store);

        let long = scorer.score_at(200.0, "a normally sized description", "a", 12);
        // Identical amount/hour with a 3-char description; the raw signal
        // also moves toward anomalous, so the score must not decrease.
        let terse = scorer.score_at(200.0, "atm", "a", 12);
        assert!(terse >= long, "terse={} long={}", terse, long);
    }

    #[test]
    fn test_terse_overlay_uses_character_count() {
        let store = store_with_forest();
        let scorer = FraudScorer::new(&store);

        // "café" is 4 characters (5 UTF-8 bytes); it must score exactly
        // like a 4-character ASCII description, terse overlay included.
        let accented = scorer.score_at(200.0, "café", "a", 12);
        let ascii = scorer.score_at(200.0, "cafe", "a", 12);
        assert_eq!(accented, ascii);
    }

    #[test]
    fn test_late_night_overlay_monotonic() {
        let store = store_with_forest();
        let scorer = FraudScorer::new(&store);

        let midday = scorer.score_at(200.0, "restaurant dinner for two", "a", 12);
        let late = scorer.score_at(200.0, "restaurant dinner for two", "a", 3);
        assert!(late >= midday, "late={} midday={}", late, midday);
    }

    #[test]
    fn test_all_overlays_capped_at_one() {
        let store = store_with_forest();
        let scorer = FraudScorer::new(&store);

        // Every overlay fires and the base signal is strongly anomalous
        let score = scorer.score_at(500_000.0, "atm", "a", 1);
        assert!(score <= 1.0);
        assert!(score > FLAG_THRESHOLD, "expected a flag, got {}", score);
        assert!(is_flagged(score));
    }

    #[test]
    fn test_account_id_does_not_change_score() {
        let store = store_with_forest();
        let scorer = FraudScorer::new(&store);

        let a = scorer.score_at(320.0, "weekly grocery shopping", "account-a", 10);
        let b = scorer.score_at(320.0, "weekly grocery shopping", "account-b", 10);
        assert_eq!(a, b);
    }

    #[test]
    fn test_score_idempotent_with_injected_hour() {
        let store = store_with_forest();
        let scorer = FraudScorer::new(&store);

        let first = scorer.score_at(75.0, "pharmacy prescription", "acct", 9);
        for _ in 0..5 {
            assert_eq!(scorer.score_at(75.0, "pharmacy prescription", "acct", 9), first);
        }
    }

    #[test]
    fn test_ordinary_transaction_not_flagged() {
        let store = store_with_forest();
        let scorer = FraudScorer::new(&store);

        let score = scorer.score_at(45.0, "grocery shopping at local market", "acct", 13);
        assert!(!is_flagged(score), "ordinary purchase flagged at {}", score);
    }
}
