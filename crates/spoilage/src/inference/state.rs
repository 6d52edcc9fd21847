//! Lifecycle of a serving pipeline.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::pipeline::{InferenceError, InferencePipeline, PredictionResult};
use crate::dataset::{FeatureTable, FeatureVector, RawTable};
use crate::model::{Classifier, RandomForest};
use crate::persist::{ArtifactLoadError, format_run_id};

/// Where a serving pipeline is in its life.
///
/// ```text
/// Uninitialized --load ok--> Ready
/// Uninitialized --load err-> Failed
/// Failed        --load ok--> Ready
/// ```
///
/// A `Ready` pipeline stays ready: a failed `load` from `Ready` keeps the
/// current bundle (the load error is still returned to the caller), and
/// failed requests never change the state. Predicting in any other state
/// returns [`InferenceError::NotReady`].
#[derive(Debug)]
pub enum PipelineState<C = RandomForest> {
    Uninitialized,
    Ready(InferencePipeline<C>),
    Failed(Arc<ArtifactLoadError>),
}

impl<C> Default for PipelineState<C> {
    fn default() -> Self {
        Self::Uninitialized
    }
}

impl<C> PipelineState<C> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The load error that put this pipeline in `Failed`.
    pub fn error(&self) -> Option<&ArtifactLoadError> {
        match self {
            Self::Failed(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    pub fn pipeline(&self) -> Result<&InferencePipeline<C>, InferenceError> {
        match self {
            Self::Ready(pipeline) => Ok(pipeline),
            _ => Err(InferenceError::NotReady { state: self.name() }),
        }
    }
}

impl<C: Classifier> PipelineState<C> {
    /// Load a bundle directory into a fresh state.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let mut state = Self::default();
        // The outcome is recorded in `state`.
        let _ = state.load(dir);
        state
    }

    /// Load a bundle directory.
    ///
    /// On success the state becomes `Ready` with the new bundle. On failure
    /// the load error is returned; a `Ready` state keeps serving its current
    /// bundle, any other state becomes `Failed` and holds the same error.
    pub fn load(&mut self, dir: impl AsRef<Path>) -> Result<(), Arc<ArtifactLoadError>> {
        let dir = dir.as_ref();
        match InferencePipeline::load(dir) {
            Ok(pipeline) => {
                tracing::info!(
                    dir = %dir.display(),
                    run_id = %format_run_id(pipeline.bundle().run_id()),
                    "inference pipeline ready"
                );
                *self = Self::Ready(pipeline);
                Ok(())
            }
            Err(err) => {
                tracing::error!(dir = %dir.display(), error = %err, "failed to load artifact bundle");
                let err = Arc::new(err);
                if !self.is_ready() {
                    *self = Self::Failed(Arc::clone(&err));
                }
                Err(err)
            }
        }
    }

    pub fn predict_one(&self, vector: &FeatureVector) -> Result<PredictionResult, InferenceError> {
        self.pipeline()?.predict_one(vector)
    }

    pub fn predict_batch(&self, table: &FeatureTable) -> Result<Vec<PredictionResult>, InferenceError> {
        self.pipeline()?.predict_batch(table)
    }

    pub fn annotate(&self, table: &RawTable) -> Result<RawTable, InferenceError> {
        self.pipeline()?.annotate(table)
    }
}

impl<C> fmt::Display for PipelineState<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error() {
            Some(err) => write!(f, "{}: {err}", self.name()),
            None => f.write_str(self.name()),
        }
    }
}
