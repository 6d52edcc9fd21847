//! Training: labeled data in, artifact bundle and evaluation report out.
//!
//! # Key Types
//!
//! - [`TrainingPipeline`]: runs validation, encoding, splitting, scaling,
//!   fitting and evaluation in order
//! - [`TrainingConfig`]: split fraction, seed, stratification, verbosity
//! - [`ClassificationReport`]: held-out metrics for reporting tools
//! - [`TrainingLogger`], [`Verbosity`]: step-by-step progress events
//! - [`TrainingError`], [`InsufficientDataError`]: run failures

mod config;
mod logger;
mod metrics;
mod pipeline;
mod split;

pub use config::{ConfigError, TrainingConfig};
pub use logger::{TrainingLogger, Verbosity};
pub use metrics::{AveragedMetrics, ClassMetrics, ClassificationReport, MetricValue};
pub use pipeline::{
    InsufficientDataError, TrainingError, TrainingOutcome, TrainingPipeline,
};
pub use split::{split_indices, stratified_split_indices};
