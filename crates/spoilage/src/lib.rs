//! spoilage: food spoilage classification from sensor readings.
//!
//! Five readings per sample (moisture, pH, temperature, humidity, bacterial
//! growth) are mapped to a spoilage label such as `Fresh` or
//! `Completely Spoiled`.
//!
//! # Key Types
//!
//! - [`TrainingPipeline`] - Labeled table in, [`ArtifactBundle`] and report out
//! - [`InferencePipeline`] / [`PipelineState`] - Score readings with a loaded bundle
//! - [`ArtifactBundle`] - Classifier, scaler and label codec from one run
//! - [`FeatureVector`] / [`FeatureTable`] / [`RawTable`] - Data handling
//!
//! # Training
//!
//! Configure with `TrainingConfig::builder()` and `ForestConfig::builder()`,
//! then call [`TrainingPipeline::run`] and save the bundle.
//!
//! # Inference
//!
//! Load a saved bundle with [`PipelineState::from_dir`] and call
//! `predict_one` or `predict_batch`. A batch either scores every row or
//! is rejected as a whole.

pub mod dataset;
pub mod inference;
pub mod model;
pub mod persist;
pub mod preprocess;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use dataset::{FeatureTable, FeatureVector, LABEL_COLUMN, RawTable, SchemaError};
pub use inference::{InferenceError, InferencePipeline, PipelineState, PredictionResult};
pub use model::{ClassId, Classifier, ClassifierTrainer, ForestConfig, RandomForest};
pub use persist::{ArtifactBundle, ArtifactLoadError};
pub use preprocess::{LabelCodec, ScalerState, StandardScaler};
pub use training::{ClassificationReport, TrainingConfig, TrainingError, TrainingPipeline};

pub use utils::{Parallelism, run_with_threads};
