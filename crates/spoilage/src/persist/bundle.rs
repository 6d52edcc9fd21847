//! The trained artifact bundle and its on-disk layout.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use thiserror::Error;

use super::format::{ArtifactKind, FormatError, format_run_id, frame, unframe};
use crate::dataset::{N_FEATURES, feature_columns};
use crate::model::{Classifier, RandomForest};
use crate::preprocess::{LabelCodec, ScalerState};

// ============================================================================
// Errors
// ============================================================================

/// Parts handed to [`ArtifactBundle::new`] disagree with each other.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("inconsistent artifact bundle: {0}")]
pub struct InconsistentBundle(pub String);

/// Failure to read a bundle. Every way a load can go wrong ends here, so
/// inference never starts from a partial bundle.
#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("artifact file {} is missing", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("artifact file {} is corrupt: {source}", path.display())]
    Corrupt { path: PathBuf, source: FormatError },

    #[error("{} holds a {actual:?} classifier, expected {expected:?}", path.display())]
    ClassifierKind {
        path: PathBuf,
        expected: &'static str,
        actual: String,
    },

    #[error(
        "{} belongs to training run {found:016x}, expected {expected:016x}; artifacts from different runs cannot be mixed",
        path.display()
    )]
    RunMismatch {
        path: PathBuf,
        expected: u64,
        found: u64,
    },

    #[error("{} failed validation: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error(transparent)]
    Inconsistent(#[from] InconsistentBundle),
}

/// Failure to write a bundle.
#[derive(Debug, Error)]
pub enum ArtifactWriteError {
    #[error("failed to write {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),
}

// ============================================================================
// ArtifactBundle
// ============================================================================

/// Classifier, scaler and label codec from one training run.
///
/// Immutable after construction and safe to share between threads behind an
/// [`Arc`](std::sync::Arc).
///
/// On disk a bundle is a directory with three files (`model.bin`,
/// `scaler.bin`, `label_codec.bin`), each stamped with the bundle's run id.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactBundle<C = RandomForest> {
    run_id: u64,
    classifier: C,
    scaler: ScalerState,
    codec: LabelCodec,
}

impl<C: Classifier> ArtifactBundle<C> {
    /// Assemble a bundle under a fresh run id.
    pub fn new(
        classifier: C,
        scaler: ScalerState,
        codec: LabelCodec,
    ) -> Result<Self, InconsistentBundle> {
        Self::from_parts(rand::random(), classifier, scaler, codec)
    }

    fn from_parts(
        run_id: u64,
        classifier: C,
        scaler: ScalerState,
        codec: LabelCodec,
    ) -> Result<Self, InconsistentBundle> {
        check_consistency(&classifier, &scaler, &codec)?;
        Ok(Self {
            run_id,
            classifier,
            scaler,
            codec,
        })
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn scaler(&self) -> &ScalerState {
        &self.scaler
    }

    pub fn codec(&self) -> &LabelCodec {
        &self.codec
    }

    /// Write the bundle into `dir`, creating it if needed.
    ///
    /// Each file is written to a temporary file in `dir` and renamed into
    /// place, so a crash never leaves a half-written artifact. The
    /// classifier is written last.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), ArtifactWriteError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| ArtifactWriteError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        write_artifact(dir, ArtifactKind::LabelCodec, self.run_id, &postcard::to_stdvec(&self.codec)?)?;
        write_artifact(dir, ArtifactKind::Scaler, self.run_id, &postcard::to_stdvec(&self.scaler)?)?;

        let mut model_payload = postcard::to_stdvec(C::KIND)?;
        model_payload.extend(postcard::to_stdvec(&self.classifier)?);
        write_artifact(dir, ArtifactKind::Classifier, self.run_id, &model_payload)?;

        tracing::info!(
            dir = %dir.display(),
            run_id = %format_run_id(self.run_id),
            "saved artifact bundle"
        );
        Ok(())
    }

    /// Read and validate a bundle from `dir`.
    ///
    /// Fails unless all three files exist, decode cleanly, come from the same
    /// run, hold the expected classifier kind, and agree on feature and class
    /// counts.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ArtifactLoadError> {
        let dir = dir.as_ref();

        let (codec_path, run_id, codec) = read_artifact::<LabelCodec>(dir, ArtifactKind::LabelCodec)?;
        codec.validate().map_err(|e| ArtifactLoadError::Invalid {
            path: codec_path,
            reason: e.to_string(),
        })?;

        let (scaler_path, scaler_run, scaler) = read_artifact::<ScalerState>(dir, ArtifactKind::Scaler)?;
        check_run(&scaler_path, run_id, scaler_run)?;
        scaler.validate().map_err(|e| ArtifactLoadError::Invalid {
            path: scaler_path,
            reason: e.to_string(),
        })?;

        let model_path = dir.join(ArtifactKind::Classifier.file_name());
        let bytes = read_file(&model_path)?;
        let corrupt = |source: FormatError| ArtifactLoadError::Corrupt {
            path: model_path.clone(),
            source,
        };
        let (header, payload) = unframe(&bytes, ArtifactKind::Classifier).map_err(corrupt)?;
        check_run(&model_path, run_id, header.run_id)?;

        let (kind, rest) = postcard::take_from_bytes::<String>(payload)
            .map_err(|e| corrupt(FormatError::Decoding(e)))?;
        if kind != C::KIND {
            return Err(ArtifactLoadError::ClassifierKind {
                path: model_path.clone(),
                expected: C::KIND,
                actual: kind,
            });
        }
        let classifier: C = decode_exact(rest).map_err(corrupt)?;
        classifier.validate().map_err(|e| ArtifactLoadError::Invalid {
            path: model_path.clone(),
            reason: e.to_string(),
        })?;

        let bundle = Self::from_parts(run_id, classifier, scaler, codec)?;
        tracing::info!(
            dir = %dir.display(),
            run_id = %format_run_id(run_id),
            n_classes = bundle.codec.n_classes(),
            "loaded artifact bundle"
        );
        Ok(bundle)
    }
}

fn check_consistency<C: Classifier>(
    classifier: &C,
    scaler: &ScalerState,
    codec: &LabelCodec,
) -> Result<(), InconsistentBundle> {
    if scaler.columns() != feature_columns().as_slice() {
        return Err(InconsistentBundle(format!(
            "scaler was fitted on columns {:?}",
            scaler.columns()
        )));
    }
    if classifier.n_features() != N_FEATURES {
        return Err(InconsistentBundle(format!(
            "classifier expects {} features, schema has {N_FEATURES}",
            classifier.n_features()
        )));
    }
    if classifier.n_classes() != codec.n_classes() {
        return Err(InconsistentBundle(format!(
            "classifier predicts {} classes, label codec has {}",
            classifier.n_classes(),
            codec.n_classes()
        )));
    }
    Ok(())
}

fn check_run(path: &Path, expected: u64, found: u64) -> Result<(), ArtifactLoadError> {
    if expected != found {
        return Err(ArtifactLoadError::RunMismatch {
            path: path.to_path_buf(),
            expected,
            found,
        });
    }
    Ok(())
}

fn write_artifact(
    dir: &Path,
    kind: ArtifactKind,
    run_id: u64,
    payload: &[u8],
) -> Result<(), ArtifactWriteError> {
    let path = dir.join(kind.file_name());
    let io_err = |source: io::Error| ArtifactWriteError::Io {
        path: path.clone(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&frame(kind, run_id, payload)).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(&path).map_err(|e| io_err(e.error))?;
    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>, ArtifactLoadError> {
    fs::read(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ArtifactLoadError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            ArtifactLoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Read one framed artifact; returns its path, run id and decoded value.
fn read_artifact<T: DeserializeOwned>(
    dir: &Path,
    kind: ArtifactKind,
) -> Result<(PathBuf, u64, T), ArtifactLoadError> {
    let path = dir.join(kind.file_name());
    let bytes = read_file(&path)?;
    let decoded = unframe(&bytes, kind).and_then(|(header, payload)| {
        decode_exact::<T>(payload).map(|value| (header.run_id, value))
    });
    match decoded {
        Ok((run_id, value)) => Ok((path, run_id, value)),
        Err(source) => Err(ArtifactLoadError::Corrupt { path, source }),
    }
}

/// Decode a payload that must be consumed completely.
fn decode_exact<T: DeserializeOwned>(payload: &[u8]) -> Result<T, FormatError> {
    let (value, rest) = postcard::take_from_bytes::<T>(payload)?;
    if !rest.is_empty() {
        return Err(FormatError::TrailingBytes(rest.len()));
    }
    Ok(value)
}
