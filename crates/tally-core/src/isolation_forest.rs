//! Isolation forest anomaly ensemble
//!
//! An ensemble of randomized partition trees: points that are isolated from
//! the bulk of the data in few random splits are anomalous. Scoring follows
//! the standard formulation: average path length normalized by the expected
//! path length `c(n)` of an unsuccessful binary search, mapped through
//! `2^(-E[h(x)]/c(n))`.
//!
//! The [`decision_function`](IsolationForest::decision_function) convention
//! matches the original scorer's: values lie in (-0.5, 0.5] and more
//! negative means more anomalous.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Euler-Mascheroni constant, used in the average path length correction
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Training parameters for the ensemble
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForestParams {
    /// Number of trees in the ensemble
    pub n_trees: usize,
    /// Rows subsampled per tree (capped at the data size)
    pub sample_size: usize,
    /// RNG seed for reproducible training
    pub seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            sample_size: 256,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

/// A trained isolation forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
}

impl IsolationForest {
    /// Fit an ensemble on row-major data (each row is one point).
    ///
    /// All rows must share the same dimensionality, and at least two rows
    /// are needed to form a split.
    pub fn fit(data: &[Vec<f64>], params: &IsolationForestParams) -> Result<Self> {
        if data.len() < 2 {
            return Err(Error::Training(
                "Isolation forest requires at least two data points".to_string(),
            ));
        }
        let dims = data[0].len();
        if dims == 0 || data.iter().any(|row| row.len() != dims) {
            return Err(Error::Training(
                "Isolation forest rows must be non-empty and uniform".to_string(),
            ));
        }
        if params.n_trees == 0 {
            return Err(Error::Training(
                "Isolation forest requires at least one tree".to_string(),
            ));
        }

        let sample_size = params.sample_size.min(data.len()).max(2);
        let height_limit = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(params.seed);

        let mut trees = Vec::with_capacity(params.n_trees);
        let mut indices: Vec<usize> = (0..data.len()).collect();
        for _ in 0..params.n_trees {
            indices.shuffle(&mut rng);
            let sample: Vec<usize> = indices[..sample_size].to_vec();
            trees.push(build_tree(data, &sample, 0, height_limit, &mut rng));
        }

        Ok(Self { trees, sample_size })
    }

    /// Anomaly decision value for a single point.
    ///
    /// Returns a value in (-0.5, 0.5]; more negative = more anomalous.
    pub fn decision_function(&self, point: &[f64]) -> f64 {
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| path_length(tree, point, 0))
            .sum();
        let avg_path = total / self.trees.len() as f64;
        let anomaly = 2f64.powf(-avg_path / average_path_length(self.sample_size));
        0.5 - anomaly
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

fn build_tree(
    data: &[Vec<f64>],
    rows: &[usize],
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> Node {
    if rows.len() <= 1 || depth >= height_limit {
        return Node::Leaf { size: rows.len() };
    }

    // Pick a random feature that still has spread in this partition
    let dims = data[rows[0]].len();
    let start = rng.random_range(0..dims);
    let mut chosen = None;
    for offset in 0..dims {
        let feature = (start + offset) % dims;
        let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
            let v = data[r][feature];
            (lo.min(v), hi.max(v))
        });
        if max > min {
            chosen = Some((feature, min, max));
            break;
        }
    }

    let (feature, min, max) = match chosen {
        Some(split) => split,
        // All remaining points are identical
        None => return Node::Leaf { size: rows.len() },
    };

    let threshold = rng.random_range(min..max);
    let (left, right): (Vec<usize>, Vec<usize>) =
        rows.iter().partition(|&&r| data[r][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_tree(data, &left, depth + 1, height_limit, rng)),
        right: Box::new(build_tree(data, &right, depth + 1, height_limit, rng)),
    }
}

fn path_length(node: &Node, point: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            let next = if point.get(*feature).copied().unwrap_or(0.0) < *threshold {
                left
            } else {
                right
            };
            path_length(next, point, depth + 1)
        }
    }
}

/// Expected path length of an unsuccessful search in a BST of n nodes
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let nf = n as f64;
            2.0 * ((nf - 1.0).ln() + EULER_GAMMA) - 2.0 * (nf - 1.0) / nf
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clustered_data() -> Vec<Vec<f64>> {
        // Tight cluster around (100, 40, 14)
        let mut rng_vals = Vec::new();
        for i in 0..200 {
            let jitter = (i % 10) as f64;
            rng_vals.push(vec![100.0 + jitter, 40.0 + jitter / 2.0, 14.0]);
        }
        rng_vals
    }

    #[test]
    fn test_fit_rejects_empty_data() {
        let params = IsolationForestParams::default();
        assert!(IsolationForest::fit(&[], &params).is_err());
    }

    #[test]
    fn test_fit_rejects_single_point() {
        let params = IsolationForestParams::default();
        let data = vec![vec![100.0, 12.0, 14.0]];
        assert!(IsolationForest::fit(&data, &params).is_err());
    }

    #[test]
    fn test_fit_rejects_ragged_rows() {
        let params = IsolationForestParams::default();
        let data = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(IsolationForest::fit(&data, &params).is_err());
    }

    #[test]
    fn test_outlier_scores_lower_than_inlier() {
        let data = clustered_data();
        let forest = IsolationForest::fit(&data, &IsolationForestParams::default()).unwrap();

        let inlier = forest.decision_function(&[103.0, 41.0, 14.0]);
        let outlier = forest.decision_function(&[9000.0, 3.0, 2.0]);

        assert!(
            outlier < inlier,
            "outlier {} should score below inlier {}",
            outlier,
            inlier
        );
    }

    #[test]
    fn test_decision_value_bounds() {
        let data = clustered_data();
        let forest = IsolationForest::fit(&data, &IsolationForestParams::default()).unwrap();

        for point in [
            [0.0, 0.0, 0.0],
            [100.0, 40.0, 14.0],
            [1e9, 1e9, 23.0],
        ] {
            let d = forest.decision_function(&point);
            assert!(d > -0.5 && d <= 0.5, "decision {} out of range", d);
        }
    }

    #[test]
    fn test_deterministic_given_seed() {
        let data = clustered_data();
        let params = IsolationForestParams {
            seed: 7,
            ..Default::default()
        };
        let a = IsolationForest::fit(&data, &params).unwrap();
        let b = IsolationForest::fit(&data, &params).unwrap();

        let point = [250.0, 20.0, 3.0];
        assert_eq!(a.decision_function(&point), b.decision_function(&point));
    }

    #[test]
    fn test_serde_round_trip_preserves_scores() {
        let data = clustered_data();
        let forest = IsolationForest::fit(&data, &IsolationForestParams::default()).unwrap();

        let json = serde_json::to_string(&forest).unwrap();
        let restored: IsolationForest = serde_json::from_str(&json).unwrap();

        let point = [512.0, 8.0, 4.0];
        assert_eq!(
            forest.decision_function(&point),
            restored.decision_function(&point)
        );
        assert_eq!(forest.n_trees(), restored.n_trees());
    }

    #[test]
    fn test_average_path_length_small_n() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!(average_path_length(256) > average_path_length(16));
    }
}
