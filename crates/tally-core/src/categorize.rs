//! Expense categorization from free-text descriptions
//!
//! A bag-of-words multinomial naive-Bayes classifier over unigrams and
//! adjacent bigrams. The model is trained offline by the training pipeline
//! and loaded read-only through the [`ModelStore`]; with no classifier
//! loaded every description maps to [`UNCATEGORISED`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::naive_bayes::multinomial::{MultinomialNB, MultinomialNBParameters};
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::UNCATEGORISED;
use crate::store::ModelStore;

/// Common English words carrying no category signal
const STOP_WORDS: [&str; 16] = [
    "a", "an", "and", "at", "by", "for", "from", "in", "of", "on", "or", "the", "to", "with",
    "is", "was",
];

/// A trained bag-of-words category classifier (one model artifact).
///
/// Holds the term vocabulary, the label table, and the fitted naive-Bayes
/// model. Term weighting uses raw unigram/bigram counts; additive smoothing
/// in the model covers terms unseen at training time.
#[derive(Serialize, Deserialize)]
pub struct CategoryClassifier {
    vocabulary: BTreeMap<String, usize>,
    labels: Vec<String>,
    nb: MultinomialNB<u32, u32, DenseMatrix<u32>, Vec<u32>>,
}

impl CategoryClassifier {
    /// Fit a classifier on `(description, category)` pairs with additive
    /// smoothing `alpha`.
    pub fn fit(examples: &[(String, String)], alpha: f64) -> Result<Self> {
        if examples.is_empty() {
            return Err(Error::Training(
                "Categorizer requires at least one labeled example".to_string(),
            ));
        }

        // Labels sorted; term indices assigned in first-seen order. Both
        // are deterministic for a given corpus.
        let mut labels: Vec<String> = examples.iter().map(|(_, c)| c.clone()).collect();
        labels.sort();
        labels.dedup();

        let mut vocabulary = BTreeMap::new();
        for (description, _) in examples {
            for term in terms(description) {
                let next = vocabulary.len();
                vocabulary.entry(term).or_insert(next);
            }
        }
        if vocabulary.is_empty() {
            return Err(Error::Training(
                "Categorizer corpus contains no usable terms".to_string(),
            ));
        }

        let rows: Vec<Vec<u32>> = examples
            .iter()
            .map(|(description, _)| count_row(description, &vocabulary))
            .collect();
        let y: Vec<u32> = examples
            .iter()
            .map(|(_, category)| {
                labels.iter().position(|l| l == category).unwrap_or(0) as u32
            })
            .collect();

        let x = DenseMatrix::from_2d_vec(&rows).map_err(|e| Error::Model(e.to_string()))?;
        let nb = MultinomialNB::fit(
            &x,
            &y,
            MultinomialNBParameters::default().with_alpha(alpha),
        )
        .map_err(|e| Error::Model(e.to_string()))?;

        Ok(Self {
            vocabulary,
            labels,
            nb,
        })
    }

    /// Classify a description into one of the training labels
    pub fn predict(&self, description: &str) -> Result<&str> {
        let row = count_row(description, &self.vocabulary);
        let x = DenseMatrix::from_2d_vec(&vec![row]).map_err(|e| Error::Model(e.to_string()))?;
        let predicted = self
            .nb
            .predict(&x)
            .map_err(|e| Error::Model(e.to_string()))?;
        let class = predicted.first().copied().unwrap_or(0) as usize;
        self.labels
            .get(class)
            .map(|s| s.as_str())
            .ok_or_else(|| Error::Model(format!("Class index {} out of range", class)))
    }

    /// Labels this classifier can produce
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Categorizer inference component.
///
/// Borrows the model store read-only; safe to use from any number of
/// threads concurrently.
pub struct Categorizer<'a> {
    store: &'a ModelStore,
}

impl<'a> Categorizer<'a> {
    pub fn new(store: &'a ModelStore) -> Self {
        Self { store }
    }

    /// Map a description to a category label from the closed vocabulary,
    /// or [`UNCATEGORISED`] when no classifier is loaded.
    pub fn categorize(&self, description: &str) -> &'a str {
        let classifier = match self.store.classifier() {
            Some(c) => c,
            None => return UNCATEGORISED,
        };

        match classifier.predict(description) {
            Ok(label) => label,
            Err(e) => {
                warn!(error = %e, "Categorizer prediction failed, returning sentinel");
                UNCATEGORISED
            }
        }
    }
}

/// Lower-cased word tokens with stop words removed
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}

/// Unigrams plus adjacent-word bigrams
fn terms(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut out = tokens.clone();
    for pair in tokens.windows(2) {
        out.push(format!("{} {}", pair[0], pair[1]));
    }
    out
}

fn count_row(description: &str, vocabulary: &BTreeMap<String, usize>) -> Vec<u32> {
    let mut row = vec![0u32; vocabulary.len()];
    for term in terms(description) {
        if let Some(&idx) = vocabulary.get(&term) {
            row[idx] += 1;
        }
    }
    row
}
