//! Scoring new readings with a loaded bundle.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::{FeatureTable, FeatureVector, LABEL_COLUMN, RawTable, SchemaError};
use crate::model::{ClassId, Classifier, RandomForest};
use crate::persist::{ArtifactBundle, ArtifactLoadError};
use crate::preprocess::CodecError;

/// Errors from a prediction call. None of them affect the loaded bundle;
/// the pipeline keeps serving after a failed request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("classifier produced an undecodable class id: {0}")]
    Codec(#[from] CodecError),

    #[error("inference pipeline is {state}; no artifact bundle is loaded")]
    NotReady { state: &'static str },
}

/// One decoded prediction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: String,
    pub class_id: ClassId,
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Validate → scale → classify → decode, over one shared bundle.
///
/// Read-only: clones share the same [`ArtifactBundle`], and any number of
/// threads may call the predict methods concurrently.
///
/// ```
/// use std::sync::Arc;
/// use spoilage::dataset::FeatureVector;
/// use spoilage::inference::InferencePipeline;
/// use spoilage::testing::{synthetic_dataset, train_small_bundle};
///
/// let bundle = train_small_bundle(&synthetic_dataset(90, 1)).unwrap();
/// let pipeline = InferencePipeline::new(Arc::new(bundle));
///
/// let result = pipeline
///     .predict_one(&FeatureVector::new(50.0, 7.0, 20.0, 50.0, 9.0))
///     .unwrap();
/// assert_eq!(result.label, "Completely Spoiled");
/// ```
#[derive(Debug)]
pub struct InferencePipeline<C = RandomForest> {
    bundle: Arc<ArtifactBundle<C>>,
}

impl<C> Clone for InferencePipeline<C> {
    fn clone(&self) -> Self {
        Self {
            bundle: Arc::clone(&self.bundle),
        }
    }
}

impl<C: Classifier> InferencePipeline<C> {
    pub fn new(bundle: Arc<ArtifactBundle<C>>) -> Self {
        Self { bundle }
    }

    /// Load and validate a bundle directory.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ArtifactLoadError> {
        Ok(Self::new(Arc::new(ArtifactBundle::load(dir)?)))
    }

    pub fn bundle(&self) -> &Arc<ArtifactBundle<C>> {
        &self.bundle
    }

    /// Labels this pipeline can predict, in class id order.
    pub fn classes(&self) -> &[String] {
        self.bundle.codec().classes()
    }

    fn decode(&self, class_id: ClassId) -> Result<PredictionResult, InferenceError> {
        let label = self.bundle.codec().decode(class_id)?.to_string();
        Ok(PredictionResult { label, class_id })
    }

    /// Predict one sample.
    pub fn predict_one(&self, vector: &FeatureVector) -> Result<PredictionResult, InferenceError> {
        vector.validate()?;
        let scaled = self.bundle.scaler().transform_vector(vector);
        let class_id = self.bundle.classifier().predict_row(&scaled);
        self.decode(class_id)
    }

    /// Predict one sample given as named fields. Extra fields are ignored.
    pub fn predict_record(
        &self,
        record: &BTreeMap<String, f64>,
    ) -> Result<PredictionResult, InferenceError> {
        self.predict_one(&FeatureVector::from_record(record)?)
    }

    /// Predict every row of `table`, in order.
    ///
    /// The whole table is validated first; one bad row rejects the batch and
    /// nothing is returned for the other rows.
    pub fn predict_batch(&self, table: &FeatureTable) -> Result<Vec<PredictionResult>, InferenceError> {
        table.validate()?;
        let scaled = self.bundle.scaler().transform_table(table)?;
        let ids = self.bundle.classifier().predict(scaled.values());
        let results = ids
            .into_iter()
            .map(|id| self.decode(id))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(n_rows = results.len(), "scored batch");
        Ok(results)
    }

    /// Score a raw batch and return it with the [`LABEL_COLUMN`] column set
    /// to the predicted labels.
    ///
    /// Other columns pass through untouched and row order is preserved. If
    /// the input already has a label column, it is overwritten.
    pub fn annotate(&self, table: &RawTable) -> Result<RawTable, InferenceError> {
        let features = table.feature_table()?;
        let labels = self
            .predict_batch(&features)?
            .into_iter()
            .map(|p| p.label)
            .collect();
        Ok(table.clone().with_column(LABEL_COLUMN, labels)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{FEATURE_COLUMNS, feature_columns};
    use crate::testing::{synthetic_batch, synthetic_dataset, train_small_bundle};
    use ndarray::array;

    fn pipeline() -> InferencePipeline {
        InferencePipeline::new(Arc::new(
            train_small_bundle(&synthetic_dataset(120, 21)).unwrap(),
        ))
    }

    #[test]
    fn predicts_growth_bands() {
        let p = pipeline();
        let fresh = p.predict_one(&FeatureVector::new(50.0, 7.0, 20.0, 50.0, 0.5)).unwrap();
        let spoiled = p.predict_one(&FeatureVector::new(50.0, 7.0, 20.0, 50.0, 9.0)).unwrap();
        assert_eq!(fresh.label, "Fresh");
        assert_eq!(spoiled.label, "Completely Spoiled");
        assert_eq!(p.classes()[spoiled.class_id.index()], spoiled.label);
    }

    #[test]
    fn rejects_non_finite_reading() {
        let p = pipeline();
        let err = p
            .predict_one(&FeatureVector::new(50.0, f64::INFINITY, 20.0, 50.0, 9.0))
            .unwrap_err();
        assert!(matches!(err, InferenceError::Schema(SchemaError::NonFinite { .. })));
    }

    #[test]
    fn record_with_missing_field_is_rejected() {
        let p = pipeline();
        let record: BTreeMap<String, f64> =
            [("Moisture".to_string(), 50.0), ("pH".to_string(), 7.0)].into_iter().collect();
        assert!(matches!(
            p.predict_record(&record),
            Err(InferenceError::Schema(SchemaError::MissingColumns { .. }))
        ));
    }

    #[test]
    fn batch_matches_single_predictions() {
        let p = pipeline();
        let table = synthetic_batch(25, 8).unwrap().feature_table().unwrap();
        let batch = p.predict_batch(&table).unwrap();
        assert_eq!(batch.len(), 25);
        for (i, result) in batch.iter().enumerate() {
            let single = p.predict_one(&table.row(i).unwrap()).unwrap();
            assert_eq!(result, &single);
        }
    }

    #[test]
    fn batch_with_bad_row_is_rejected_whole() {
        let p = pipeline();
        let values = array![
            [50.0, 7.0, 20.0, 50.0, 9.0],
            [50.0, f64::NAN, 20.0, 50.0, 1.0],
        ];
        let table = FeatureTable::from_array(values).unwrap();
        assert!(matches!(
            p.predict_batch(&table),
            Err(InferenceError::Schema(SchemaError::NonFinite { row: 1, .. }))
        ));
    }

    #[test]
    fn batch_with_wrong_columns_is_rejected() {
        let p = pipeline();
        let mut columns = feature_columns();
        columns.swap(0, 1);
        let table = FeatureTable::with_columns(columns, ndarray::Array2::zeros((2, 5))).unwrap();
        assert!(matches!(
            p.predict_batch(&table),
            Err(InferenceError::Schema(SchemaError::FeatureMismatch { .. }))
        ));
    }

    #[test]
    fn empty_batch_gives_empty_output() {
        let p = pipeline();
        assert!(p.predict_batch(&FeatureTable::empty()).unwrap().is_empty());
    }

    #[test]
    fn annotate_appends_label_column() {
        let p = pipeline();
        let batch = synthetic_batch(6, 3).unwrap();
        let out = p.annotate(&batch).unwrap();

        assert_eq!(out.n_rows(), 6);
        assert_eq!(out.columns().last().map(String::as_str), Some(LABEL_COLUMN));
        assert_eq!(out.column("Sample_ID"), batch.column("Sample_ID"));
        for column in FEATURE_COLUMNS {
            assert_eq!(out.column(column), batch.column(column));
        }
    }

    #[test]
    fn annotate_overwrites_existing_label_column() {
        let p = pipeline();
        let batch = synthetic_batch(3, 3)
            .unwrap()
            .with_column(LABEL_COLUMN, vec!["stale".into(); 3])
            .unwrap();
        let out = p.annotate(&batch).unwrap();
        assert_eq!(out.columns().len(), batch.columns().len());
        assert!(out.column(LABEL_COLUMN).unwrap().iter().all(|l| *l != "stale"));
    }

    #[test]
    fn annotate_names_required_columns_when_missing() {
        let p = pipeline();
        let table = RawTable::new(vec!["Moisture".into()], vec![vec!["1".into()]]).unwrap();
        match p.annotate(&table) {
            Err(InferenceError::Schema(SchemaError::MissingColumns { required, .. })) => {
                assert_eq!(required, feature_columns());
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn pipeline_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InferencePipeline>();

        let p = pipeline();
        let v = FeatureVector::new(50.0, 7.0, 20.0, 50.0, 9.0);
        let expected = p.predict_one(&v).unwrap();
        std::thread::scope(|s| {
            for _ in 0..4 {
                let p = p.clone();
                let expected = expected.clone();
                s.spawn(move || assert_eq!(p.predict_one(&v).unwrap(), expected));
            }
        });
    }
}
