//! Artifact persistence.
//!
//! # Key Types
//!
//! - [`ArtifactBundle`]: classifier, scaler and label codec from one run
//! - [`ArtifactLoadError`]: the single error type for every load failure
//! - [`ArtifactWriteError`]: save failures
//!
//! See [`format`] for the on-disk frame.

mod bundle;
pub mod format;

pub use bundle::{ArtifactBundle, ArtifactLoadError, ArtifactWriteError, InconsistentBundle};
pub use format::{ArtifactKind, FormatError, format_run_id};
