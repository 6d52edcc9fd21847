//! Synthetic data for tests, examples and benchmarks.
//!
//! Labels follow a fixed rule on bacterial growth only:
//!
//! | `Bacterial_Growth` | label                |
//! |--------------------|----------------------|
//! | `> 7`              | `Completely Spoiled` |
//! | `< 2`              | `Fresh`              |
//! | otherwise          | `Partially Spoiled`  |

use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::dataset::{FeatureVector, RawTable, SchemaError, feature_columns};
use crate::model::{ForestConfig, RandomForest};
use crate::persist::ArtifactBundle;
use crate::training::{TrainingConfig, TrainingError, TrainingPipeline};

pub const FRESH: &str = "Fresh";
pub const PARTIALLY_SPOILED: &str = "Partially Spoiled";
pub const COMPLETELY_SPOILED: &str = "Completely Spoiled";

/// Label assigned by the synthetic rule.
pub fn spoilage_label(bacterial_growth: f64) -> &'static str {
    if bacterial_growth > 7.0 {
        COMPLETELY_SPOILED
    } else if bacterial_growth < 2.0 {
        FRESH
    } else {
        PARTIALLY_SPOILED
    }
}

/// Random sensor readings whose growth falls clearly inside class `class % 3`'s band.
pub fn synthetic_vector(rng: &mut impl Rng, class: usize) -> FeatureVector {
    let bacterial_growth = match class % 3 {
        0 => rng.gen_range(0.0..1.8),
        1 => rng.gen_range(2.2..6.8),
        _ => rng.gen_range(7.2..10.0),
    };
    FeatureVector::new(
        rng.gen_range(20.0..80.0),
        rng.gen_range(4.0..8.0),
        rng.gen_range(0.0..35.0),
        rng.gen_range(30.0..90.0),
        bacterial_growth,
    )
}

/// `n_rows` labeled vectors cycling through the three classes.
pub fn synthetic_vectors(n_rows: usize, seed: u64) -> Vec<(FeatureVector, &'static str)> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..n_rows)
        .map(|i| {
            let v = synthetic_vector(&mut rng, i);
            (v, spoilage_label(v.bacterial_growth))
        })
        .collect()
}

/// Training table with the five feature columns and the label column.
///
/// Classes are balanced to within one row.
pub fn synthetic_dataset(n_rows: usize, seed: u64) -> RawTable {
    RawTable::from_labeled_vectors(synthetic_vectors(n_rows, seed))
}

/// Batch input: the feature columns plus a pass-through `Sample_ID` column
/// placed first.
pub fn synthetic_batch(n_rows: usize, seed: u64) -> Result<RawTable, SchemaError> {
    let mut columns = vec!["Sample_ID".to_string()];
    columns.extend(feature_columns());
    let rows = synthetic_vectors(n_rows, seed)
        .into_iter()
        .enumerate()
        .map(|(i, (v, _))| {
            let mut row = vec![format!("S{i:04}")];
            row.extend(v.to_array().iter().map(|x| x.to_string()));
            row
        })
        .collect();
    RawTable::new(columns, rows)
}

/// Train a small (20 tree) forest on `table`.
pub fn train_small_bundle(table: &RawTable) -> Result<ArtifactBundle<RandomForest>, TrainingError> {
    let forest = ForestConfig {
        n_trees: 20,
        ..ForestConfig::default()
    };
    let pipeline = TrainingPipeline::with_forest(TrainingConfig::default(), forest);
    Ok(pipeline.run(table)?.bundle)
}
