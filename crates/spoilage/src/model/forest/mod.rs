//! Random forest classifier.
//!
//! # Key Types
//!
//! - [`RandomForest`]: trained ensemble of [`DecisionTree`]s
//! - [`RandomForestTrainer`]: fits a forest from a [`ForestConfig`]
//!
//! Trees are fitted independently (in parallel when allowed). Tree `i` draws
//! its bootstrap sample and feature order from its own generator seeded with
//! `seed + i`, so the fitted forest does not depend on thread scheduling.

mod config;
mod grower;
mod tree;

pub use config::{ForestConfig, ForestConfigError, MaxFeatures};
pub use tree::{DecisionTree, NodeId, TreeValidationError};

use ndarray::{Array2, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use self::grower::{GrowerParams, TreeGrower};
use super::{ClassId, Classifier, ClassifierTrainer, FitError, ModelValidationError};
use crate::utils::run_with_threads;

// =============================================================================
// RandomForest
// =============================================================================

/// A trained random forest.
///
/// Prediction averages the leaf class distributions of all trees and picks
/// the most probable class; ties resolve to the lowest class id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean class probabilities for one scaled row.
    pub fn predict_proba_row(&self, row: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba_row(row)) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len().max(1) as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        proba
    }

    /// Mean class probabilities, shape `[n_rows, n_classes]`.
    pub fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut out = Array2::zeros((features.nrows(), self.n_classes));
        for (row, mut out_row) in features.axis_iter(Axis(0)).zip(out.axis_iter_mut(Axis(0))) {
            let proba = self.predict_proba_row(&row.to_vec());
            for (o, p) in out_row.iter_mut().zip(proba) {
                *o = p;
            }
        }
        out
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

impl Classifier for RandomForest {
    const KIND: &'static str = "random_forest";

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_row(&self, row: &[f64]) -> ClassId {
        ClassId::new(argmax(&self.predict_proba_row(row)) as u32)
    }

    fn validate(&self) -> Result<(), ModelValidationError> {
        if self.trees.is_empty() {
            return Err(ModelValidationError::NoTrees);
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if tree.n_classes() != self.n_classes {
                return Err(ModelValidationError::InvalidTree {
                    tree: i,
                    reason: format!(
                        "tree has {} classes, forest has {}",
                        tree.n_classes(),
                        self.n_classes
                    ),
                });
            }
            tree.validate(self.n_features)
                .map_err(|e| ModelValidationError::InvalidTree {
                    tree: i,
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }
}

// =============================================================================
// RandomForestTrainer
// =============================================================================

/// Fits [`RandomForest`] models.
#[derive(Debug, Clone, Default)]
pub struct RandomForestTrainer {
    config: ForestConfig,
}

impl RandomForestTrainer {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}

impl ClassifierTrainer for RandomForestTrainer {
    type Model = RandomForest;

    fn fit(
        &self,
        features: ArrayView2<'_, f64>,
        targets: &[ClassId],
        n_classes: usize,
    ) -> Result<RandomForest, FitError> {
        let config = &self.config;
        config.validate()?;
        super::check_fit_inputs(features, targets, n_classes)?;

        let n_rows = features.nrows();
        let n_features = features.ncols();
        let grower = TreeGrower::new(
            features,
            targets,
            n_classes,
            GrowerParams::from_config(config, n_features),
        );

        let trees = run_with_threads(config.n_threads, |parallelism| {
            parallelism.maybe_par_map(0..config.n_trees, |tree_index| {
                let mut rng =
                    Xoshiro256PlusPlus::seed_from_u64(config.seed.wrapping_add(tree_index as u64));
                let samples: Vec<usize> = if config.bootstrap {
                    (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect()
                } else {
                    (0..n_rows).collect()
                };
                grower.grow(samples, &mut rng)
            })
        });

        tracing::debug!(
            n_trees = trees.len(),
            n_rows,
            n_classes,
            "fitted random forest"
        );

        Ok(RandomForest {
            n_features,
            n_classes,
            trees,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn toy() -> (Array2<f64>, Vec<ClassId>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [5.0, 5.0],
            [5.1, 5.2],
            [5.2, 4.9],
            [10.0, 0.0],
            [10.1, 0.2],
            [9.9, 0.1],
        ];
        let y = [0, 0, 0, 1, 1, 1, 2, 2, 2].map(ClassId::new).to_vec();
        (x, y)
    }

    fn small_config() -> ForestConfig {
        ForestConfig::builder().n_trees(15).build().unwrap()
    }

    #[test]
    fn argmax_prefers_lowest_on_tie() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax(&[0.1, 0.45, 0.45]), 1);
        assert_eq!(argmax(&[0.0, 0.0, 1.0]), 2);
    }

    #[test]
    fn fits_separable_clusters() {
        let (x, y) = toy();
        let forest = RandomForestTrainer::new(small_config())
            .fit(x.view(), &y, 3)
            .unwrap();

        assert_eq!(forest.n_trees(), 15);
        assert!(forest.validate().is_ok());
        assert_eq!(forest.predict(x.view()), y);
        assert_eq!(forest.predict_row(&[0.05, 0.05]), ClassId::new(0));
        assert_eq!(forest.predict_row(&[10.0, 0.1]), ClassId::new(2));
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (x, y) = toy();
        let forest = RandomForestTrainer::new(small_config())
            .fit(x.view(), &y, 3)
            .unwrap();
        let proba = forest.predict_proba(x.view());
        assert_eq!(proba.dim(), (9, 3));
        for row in proba.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn same_seed_same_forest_regardless_of_threads() {
        let (x, y) = toy();
        let sequential = ForestConfig::builder().n_trees(10).n_threads(1).build().unwrap();
        let parallel = ForestConfig::builder().n_trees(10).n_threads(4).build().unwrap();
        let a = RandomForestTrainer::new(sequential).fit(x.view(), &y, 3).unwrap();
        let b = RandomForestTrainer::new(parallel).fit(x.view(), &y, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_agree_on_separable_data() {
        let (x, y) = toy();
        let a = RandomForestTrainer::new(ForestConfig::builder().n_trees(5).seed(1).build().unwrap())
            .fit(x.view(), &y, 3)
            .unwrap();
        let b = RandomForestTrainer::new(ForestConfig::builder().n_trees(5).seed(2).build().unwrap())
            .fit(x.view(), &y, 3)
            .unwrap();
        assert_eq!(a.predict(x.view()), b.predict(x.view()));
    }

    #[test]
    fn rejects_bad_input() {
        let (x, y) = toy();
        let trainer = RandomForestTrainer::default();
        assert!(matches!(
            trainer.fit(x.view(), &y[..3], 3),
            Err(FitError::LengthMismatch { .. })
        ));
        assert!(matches!(
            trainer.fit(x.view(), &y, 2),
            Err(FitError::TargetOutOfRange { id: 2, .. })
        ));
    }

    #[test]
    fn invalid_config_is_reported() {
        let (x, y) = toy();
        let mut config = ForestConfig::default();
        config.n_trees = 0;
        assert_eq!(
            RandomForestTrainer::new(config).fit(x.view(), &y, 3),
            Err(FitError::Config(ForestConfigError::InvalidNTrees))
        );
    }

    #[test]
    fn validate_catches_class_count_drift() {
        let (x, y) = toy();
        let mut forest = RandomForestTrainer::new(small_config())
            .fit(x.view(), &y, 3)
            .unwrap();
        forest.n_classes = 4;
        assert!(matches!(
            forest.validate(),
            Err(ModelValidationError::InvalidTree { tree: 0, .. })
        ));
        forest.trees.clear();
        assert_eq!(forest.validate(), Err(ModelValidationError::NoTrees));
    }
}
