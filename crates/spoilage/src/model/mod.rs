//! Classifier capability.
//!
//! The pipelines only depend on two traits:
//!
//! - [`ClassifierTrainer`]: fits a model from scaled features and class ids
//! - [`Classifier`]: the trained, immutable, serialisable model
//!
//! Any algorithm implementing both can be dropped into
//! [`TrainingPipeline`](crate::training::TrainingPipeline). The crate ships a
//! random forest ([`forest`]) as the default.

pub mod forest;

use std::fmt;

use ndarray::{ArrayView2, Axis};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use forest::{ForestConfig, ForestConfigError, MaxFeatures, RandomForest, RandomForestTrainer};

// =============================================================================
// ClassId
// =============================================================================

/// Integer class identifier in `[0, n_classes)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(u32);

impl ClassId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// The id as a slice index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors from fitting a classifier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("cannot fit a classifier on zero rows")]
    Empty,

    #[error("features have {features} rows but targets have {targets}")]
    LengthMismatch { features: usize, targets: usize },

    #[error("target class id {id} out of range for {n_classes} classes")]
    TargetOutOfRange { id: u32, n_classes: usize },

    #[error("row {row}, feature {feature}: non-finite value")]
    NonFinite { row: usize, feature: usize },

    #[error("invalid configuration: {0}")]
    Config(#[from] ForestConfigError),
}

/// Structural problems in a (typically deserialized) model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelValidationError {
    #[error("model has no trees")]
    NoTrees,

    #[error("tree {tree}: {reason}")]
    InvalidTree { tree: usize, reason: String },
}

// =============================================================================
// Traits
// =============================================================================

/// A trained multi-class model.
///
/// Prediction must be deterministic: the same state and input always give
/// the same ids. Implementations hold no interior mutability, so one model
/// can serve concurrent callers.
pub trait Classifier: Serialize + DeserializeOwned + Send + Sync {
    /// Stable tag persisted next to the model; loading a bundle whose tag
    /// differs is a hard error.
    const KIND: &'static str;

    fn n_features(&self) -> usize;

    fn n_classes(&self) -> usize;

    /// Predict one already-scaled row of length [`n_features`](Self::n_features).
    fn predict_row(&self, row: &[f64]) -> ClassId;

    /// Predict every row of a `[n_rows, n_features]` matrix, in row order.
    fn predict(&self, features: ArrayView2<'_, f64>) -> Vec<ClassId> {
        features
            .axis_iter(Axis(0))
            .map(|row| match row.as_slice() {
                Some(slice) => self.predict_row(slice),
                None => self.predict_row(&row.to_vec()),
            })
            .collect()
    }

    /// Structural self-check run after deserialization.
    fn validate(&self) -> Result<(), ModelValidationError>;
}

/// Fits a [`Classifier`].
///
/// Any randomness must be seeded from the trainer's configuration so that
/// repeated fits on identical input produce identical models.
pub trait ClassifierTrainer {
    type Model: Classifier;

    /// Fit on scaled features `[n_rows, n_features]` and one target per row.
    fn fit(
        &self,
        features: ArrayView2<'_, f64>,
        targets: &[ClassId],
        n_classes: usize,
    ) -> Result<Self::Model, FitError>;
}

/// Shared input checks for trainers.
pub(crate) fn check_fit_inputs(
    features: ArrayView2<'_, f64>,
    targets: &[ClassId],
    n_classes: usize,
) -> Result<(), FitError> {
    if features.nrows() == 0 {
        return Err(FitError::Empty);
    }
    if features.nrows() != targets.len() {
        return Err(FitError::LengthMismatch {
            features: features.nrows(),
            targets: targets.len(),
        });
    }
    if let Some(bad) = targets.iter().find(|t| t.index() >= n_classes) {
        return Err(FitError::TargetOutOfRange {
            id: bad.get(),
            n_classes,
        });
    }
    for ((row, feature), value) in features.indexed_iter() {
        if !value.is_finite() {
            return Err(FitError::NonFinite { row, feature });
        }
    }
    Ok(())
}
