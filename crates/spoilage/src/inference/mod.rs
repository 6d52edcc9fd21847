//! Inference: scoring readings with a loaded artifact bundle.
//!
//! # Key Types
//!
//! - [`InferencePipeline`]: validate, scale, classify and decode, for one
//!   reading or a whole batch
//! - [`PipelineState`]: uninitialized, ready or failed
//! - [`PredictionResult`]: decoded label plus class id
//!
//! Batches are all-or-nothing: a single invalid row rejects the request.

mod pipeline;
mod state;

pub use pipeline::{InferenceError, InferencePipeline, PredictionResult};
pub use state::PipelineState;
