//! The training pipeline.

use std::path::Path;
use std::time::Instant;

use thiserror::Error;

use super::config::{ConfigError, TrainingConfig};
use super::logger::TrainingLogger;
use super::metrics::ClassificationReport;
use super::split::{split_indices, stratified_split_indices};
use crate::dataset::{DatasetLoadError, LabeledDataset, RawTable, SchemaError, read_csv};
use crate::model::{
    ClassId, Classifier, ClassifierTrainer, FitError, ForestConfig, RandomForest,
    RandomForestTrainer,
};
use crate::persist::{ArtifactBundle, ArtifactWriteError, InconsistentBundle};
use crate::preprocess::{CodecError, LabelCodec, ScalerError, StandardScaler};

// =============================================================================
// Errors
// =============================================================================

/// The labeled data cannot support a training run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsufficientDataError {
    #[error("training data has no rows")]
    NoRows,

    #[error("training data has {found} distinct label(s); at least 2 are required")]
    TooFewClasses { found: usize },

    #[error("class {label:?} has no rows in the training split")]
    ClassMissingFromTrainingSplit { label: String },
}

/// Any failure of a training run. No artifact is written when a run fails.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] DatasetLoadError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Scaler(#[from] ScalerError),

    #[error("classifier fit failed: {0}")]
    Fit(#[from] FitError),

    #[error(transparent)]
    Bundle(#[from] InconsistentBundle),

    #[error(transparent)]
    Write(#[from] ArtifactWriteError),
}

// =============================================================================
// TrainingPipeline
// =============================================================================

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome<C = RandomForest> {
    pub bundle: ArtifactBundle<C>,
    /// Metrics on the held-out split. Reported, never enforced.
    pub report: ClassificationReport,
}

/// Labeled table in, [`ArtifactBundle`] and [`ClassificationReport`] out.
///
/// Steps, each checked before the next:
///
/// 1. validate the table (five features plus the label column)
/// 2. fit the [`LabelCodec`] and encode labels
/// 3. split into training and evaluation rows (seeded)
/// 4. fit the scaler on the training rows only
/// 5. scale both splits
/// 6. fit the classifier on the scaled training rows
/// 7. evaluate on the scaled evaluation rows
/// 8. assemble the bundle
///
/// ```
/// use spoilage::testing::synthetic_dataset;
/// use spoilage::training::TrainingPipeline;
///
/// let pipeline: TrainingPipeline = TrainingPipeline::default();
/// let outcome = pipeline.run(&synthetic_dataset(90, 7)).unwrap();
/// assert_eq!(outcome.bundle.codec().n_classes(), 3);
/// assert!(outcome.report.accuracy > 0.8);
/// ```
#[derive(Debug, Clone)]
pub struct TrainingPipeline<T = RandomForestTrainer> {
    config: TrainingConfig,
    trainer: T,
}

impl TrainingPipeline<RandomForestTrainer> {
    /// Pipeline with the default random forest trainer.
    pub fn with_forest(config: TrainingConfig, forest: ForestConfig) -> Self {
        Self::new(config, RandomForestTrainer::new(forest))
    }
}

impl Default for TrainingPipeline<RandomForestTrainer> {
    fn default() -> Self {
        Self::with_forest(TrainingConfig::default(), ForestConfig::default())
    }
}

impl<T: ClassifierTrainer> TrainingPipeline<T> {
    pub fn new(config: TrainingConfig, trainer: T) -> Self {
        Self { config, trainer }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn trainer(&self) -> &T {
        &self.trainer
    }

    /// Train from a raw table that must hold exactly the feature columns and
    /// the label column.
    pub fn run(&self, table: &RawTable) -> Result<TrainingOutcome<T::Model>, TrainingError> {
        let dataset = table.labeled_dataset()?;
        self.run_dataset(&dataset)
    }

    /// Read a CSV file and train on it.
    pub fn run_csv(&self, path: impl AsRef<Path>) -> Result<TrainingOutcome<T::Model>, TrainingError> {
        let table = read_csv(path)?;
        self.run(&table)
    }

    /// Train and save the bundle into `dir`. Nothing is written if training fails.
    pub fn run_and_save(
        &self,
        table: &RawTable,
        dir: impl AsRef<Path>,
    ) -> Result<TrainingOutcome<T::Model>, TrainingError> {
        let outcome = self.run(table)?;
        outcome.bundle.save(dir)?;
        Ok(outcome)
    }

    /// Train on an already validated dataset.
    pub fn run_dataset(
        &self,
        dataset: &LabeledDataset,
    ) -> Result<TrainingOutcome<T::Model>, TrainingError> {
        self.config.validate()?;
        let logger = TrainingLogger::new(self.config.verbosity);

        let n_rows = dataset.n_rows();
        if n_rows == 0 {
            return Err(InsufficientDataError::NoRows.into());
        }

        // Labels
        let codec = LabelCodec::fit(dataset.labels())?;
        let n_classes = codec.n_classes();
        if n_classes < 2 {
            return Err(InsufficientDataError::TooFewClasses { found: n_classes }.into());
        }
        let targets = codec.encode_all(dataset.labels())?;
        logger.start_training(n_rows, n_classes);

        // Split
        let (train_idx, eval_idx) = if self.config.stratify {
            stratified_split_indices(&targets, n_classes, self.config.test_fraction, self.config.seed)
        } else {
            split_indices(n_rows, self.config.test_fraction, self.config.seed)
        };
        let select = |rows: &[usize]| -> Vec<ClassId> { rows.iter().map(|&i| targets[i]).collect() };
        let train_y = select(&train_idx);
        let eval_y = select(&eval_idx);
        check_class_coverage(&codec, &train_y)?;
        logger.log_split(train_idx.len(), eval_idx.len(), self.config.stratify);

        // Scale, fitting on training rows only
        let train_x = dataset.features().select_rows(&train_idx);
        let eval_x = dataset.features().select_rows(&eval_idx);
        let scaler = StandardScaler::fit(&train_x)?;
        logger.log_scaler(scaler.means(), scaler.scales());
        let train_x = scaler.transform_table(&train_x)?;
        let eval_x = scaler.transform_table(&eval_x)?;

        // Fit
        let started = Instant::now();
        let model = self.trainer.fit(train_x.values(), &train_y, n_classes)?;
        logger.log_fit(T::Model::KIND, started.elapsed());

        // Evaluate
        let eval_pred = model.predict(eval_x.values());
        let report = ClassificationReport::compute(codec.classes(), &eval_y, &eval_pred);
        logger.log_report(&report);

        let bundle = ArtifactBundle::new(model, scaler, codec)?;
        logger.finish_training(bundle.run_id());
        Ok(TrainingOutcome { bundle, report })
    }
}

fn check_class_coverage(codec: &LabelCodec, train_y: &[ClassId]) -> Result<(), InsufficientDataError> {
    let mut seen = vec![false; codec.n_classes()];
    for id in train_y {
        seen[id.index()] = true;
    }
    match seen.iter().position(|s| !s) {
        Some(missing) => Err(InsufficientDataError::ClassMissingFromTrainingSplit {
            label: codec.classes()[missing].clone(),
        }),
        None => Ok(()),
    }
}
