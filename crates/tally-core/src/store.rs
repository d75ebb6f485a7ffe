//! Model store: loads trained artifacts once at startup
//!
//! The store owns the three optional models (categorizer, spending template,
//! fraud detector) and hands out read-only access to the inference
//! components. A missing artifact is a supported configuration, not an
//! error: the affected component degrades to its documented fallback.
//! There is no reload: a slot that is absent at load time stays absent for
//! the process lifetime.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::categorize::CategoryClassifier;
use crate::error::{Error, Result};
use crate::forecast::SpendingTemplate;
use crate::isolation_forest::IsolationForest;

/// Artifact envelope format version. Bumped on incompatible layout changes;
/// a mismatch is treated the same as an unreadable file.
pub const ARTIFACT_FORMAT: u32 = 1;

/// Artifact file names within the models directory
pub const CATEGORISER_FILE: &str = "categoriser.json";
pub const SPENDING_FILE: &str = "spending_predictor.json";
pub const FRAUD_FILE: &str = "fraud_detector.json";

/// Default artifact directory (~/.local/share/tally/models on Linux/Mac)
pub fn default_models_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
        .join("models")
}

/// Outcome of loading one artifact slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// Artifact loaded and ready
    Present,
    /// No artifact file on disk (expected soft condition)
    Absent,
    /// File exists but could not be deserialized or has the wrong format
    Unreadable,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Present => "present",
            SlotStatus::Absent => "absent",
            SlotStatus::Unreadable => "unreadable",
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, SlotStatus::Present)
    }
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-slot load outcomes, retained for status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub categoriser: SlotStatus,
    pub spending: SlotStatus,
    pub fraud: SlotStatus,
}

impl ModelStatus {
    fn all_absent() -> Self {
        Self {
            categoriser: SlotStatus::Absent,
            spending: SlotStatus::Absent,
            fraud: SlotStatus::Absent,
        }
    }
}

/// Read-only holder of the loaded models.
///
/// Constructed once during startup and shared by reference (or `Arc`) with
/// the inference components. Contains no interior mutability, so concurrent
/// readers need no coordination.
pub struct ModelStore {
    classifier: Option<CategoryClassifier>,
    forecaster: Option<SpendingTemplate>,
    anomaly: Option<IsolationForest>,
    status: ModelStatus,
}

impl ModelStore {
    /// Load all artifact slots from a directory. Never fails: missing or
    /// unreadable artifacts leave their slot empty and are reported via
    /// [`ModelStore::status`] and the log.
    pub fn load(dir: &Path) -> Self {
        let (classifier, categoriser_status) =
            load_slot::<CategoryClassifier>(&dir.join(CATEGORISER_FILE), "categoriser");
        let (forecaster, spending_status) =
            load_slot::<SpendingTemplate>(&dir.join(SPENDING_FILE), "spending predictor");
        let (anomaly, fraud_status) =
            load_slot::<IsolationForest>(&dir.join(FRAUD_FILE), "fraud detector");

        // An envelope with zero trees deserializes fine but cannot score
        // anything; treat it like any other corrupt artifact.
        let (anomaly, fraud_status) = match anomaly {
            Some(forest) if forest.n_trees() == 0 => {
                error!(
                    model = "fraud detector",
                    path = %dir.join(FRAUD_FILE).display(),
                    "Model artifact contains an empty ensemble, running without it"
                );
                (None, SlotStatus::Unreadable)
            }
            other => (other, fraud_status),
        };

        Self {
            classifier,
            forecaster,
            anomaly,
            status: ModelStatus {
                categoriser: categoriser_status,
                spending: spending_status,
                fraud: fraud_status,
            },
        }
    }

    /// A store with every slot empty. All inference degrades to fallbacks.
    pub fn empty() -> Self {
        Self {
            classifier: None,
            forecaster: None,
            anomaly: None,
            status: ModelStatus::all_absent(),
        }
    }

    /// Assemble a store directly from in-memory models. Primarily for tests,
    /// which may want zero, one, or all three slots filled.
    pub fn from_parts(
        classifier: Option<CategoryClassifier>,
        forecaster: Option<SpendingTemplate>,
        anomaly: Option<IsolationForest>,
    ) -> Self {
        let to_status = |present: bool| {
            if present {
                SlotStatus::Present
            } else {
                SlotStatus::Absent
            }
        };
        let status = ModelStatus {
            categoriser: to_status(classifier.is_some()),
            spending: to_status(forecaster.is_some()),
            fraud: to_status(anomaly.is_some()),
        };
        Self {
            classifier,
            forecaster,
            anomaly,
            status,
        }
    }

    pub fn classifier(&self) -> Option<&CategoryClassifier> {
        self.classifier.as_ref()
    }

    pub fn forecaster(&self) -> Option<&SpendingTemplate> {
        self.forecaster.as_ref()
    }

    pub fn anomaly(&self) -> Option<&IsolationForest> {
        self.anomaly.as_ref()
    }

    pub fn status(&self) -> ModelStatus {
        self.status
    }
}

/// Versioned on-disk wrapper around a serialized model
#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    format: u32,
    model: T,
}

/// Read a model out of its artifact envelope, checking the format version
pub fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    let envelope: Envelope<T> = serde_json::from_reader(BufReader::new(file))?;
    if envelope.format != ARTIFACT_FORMAT {
        return Err(Error::Artifact(format!(
            "{}: unsupported artifact format {} (expected {})",
            path.display(),
            envelope.format,
            ARTIFACT_FORMAT
        )));
    }
    Ok(envelope.model)
}

/// Write a model into its artifact envelope
pub fn write_artifact<T: Serialize>(path: &Path, model: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let envelope = Envelope {
        format: ARTIFACT_FORMAT,
        model,
    };
    serde_json::to_writer(BufWriter::new(file), &envelope)?;
    Ok(())
}

fn load_slot<T: DeserializeOwned>(path: &Path, name: &str) -> (Option<T>, SlotStatus) {
    if !path.exists() {
        warn!(
            model = name,
            path = %path.display(),
            "Model artifact not found, running without it (run `tally train` to create it)"
        );
        return (None, SlotStatus::Absent);
    }

    match read_artifact::<T>(path) {
        Ok(model) => {
            info!(model = name, path = %path.display(), "Loaded model artifact");
            (Some(model), SlotStatus::Present)
        }
        Err(e) => {
            // Degrades like an absent model, but this is worth a loud log:
            // a corrupt fraud detector silently disables fraud detection.
            error!(
                model = name,
                path = %path.display(),
                error = %e,
                "Model artifact present but unreadable, running without it"
            );
            (None, SlotStatus::Unreadable)
        }
    }
}
