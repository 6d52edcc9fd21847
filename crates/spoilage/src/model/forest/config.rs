//! Random forest configuration with builder pattern.
//!
//! # Example
//!
//! ```
//! use spoilage::model::{ForestConfig, MaxFeatures};
//!
//! // All defaults: 100 trees, sqrt feature sampling, seed 42
//! let config = ForestConfig::builder().build().unwrap();
//! assert_eq!(config.n_trees, 100);
//!
//! let config = ForestConfig::builder()
//!     .n_trees(25)
//!     .max_depth(8)
//!     .max_features(MaxFeatures::All)
//!     .build()
//!     .unwrap();
//! ```

use bon::Builder;
use serde::{Deserialize, Serialize};

// =============================================================================
// ForestConfigError
// =============================================================================

/// Errors that can occur during forest configuration validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ForestConfigError {
    /// Number of trees must be at least 1.
    InvalidNTrees,
    /// A depth limit of zero would leave no root split decision.
    InvalidMaxDepth,
    /// `min_samples_split` must be at least 2.
    InvalidMinSamplesSplit(usize),
    /// `min_samples_leaf` must be at least 1.
    InvalidMinSamplesLeaf,
    /// Fixed feature count must be at least 1.
    InvalidMaxFeatures,
}

impl std::fmt::Display for ForestConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNTrees => write!(f, "n_trees must be at least 1"),
            Self::InvalidMaxDepth => write!(f, "max_depth must be at least 1"),
            Self::InvalidMinSamplesSplit(v) => {
                write!(f, "min_samples_split must be at least 2, got {}", v)
            }
            Self::InvalidMinSamplesLeaf => write!(f, "min_samples_leaf must be at least 1"),
            Self::InvalidMaxFeatures => write!(f, "max_features must be at least 1"),
        }
    }
}

impl std::error::Error for ForestConfigError {}

// =============================================================================
// MaxFeatures
// =============================================================================

/// Number of candidate features examined at each split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `ceil(sqrt(n_features))`, at least 1.
    #[default]
    Sqrt,
    /// `ceil(log2(n_features))`, at least 1.
    Log2,
    /// Every feature.
    All,
    /// A fixed count, clamped to `n_features`.
    Fixed(usize),
}

impl MaxFeatures {
    /// Resolve to a concrete count in `[1, n_features]`.
    pub fn resolve(self, n_features: usize) -> usize {
        let n = n_features.max(1);
        let k = match self {
            MaxFeatures::Sqrt => (n as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n as f64).log2().ceil() as usize,
            MaxFeatures::All => n,
            MaxFeatures::Fixed(k) => k,
        };
        k.clamp(1, n)
    }
}

// =============================================================================
// ForestConfig
// =============================================================================

/// Hyperparameters for [`RandomForestTrainer`](super::RandomForestTrainer).
///
/// Defaults mirror a conventional random forest: 100 fully grown trees,
/// bootstrap sampling and `sqrt` feature subsampling.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees. Default: 100.
    #[builder(default = 100)]
    pub n_trees: usize,

    /// Maximum tree depth. `None` grows until leaves are pure or too small.
    pub max_depth: Option<usize>,

    /// Minimum samples in a node before it may be split. Default: 2.
    #[builder(default = 2)]
    pub min_samples_split: usize,

    /// Minimum samples on each side of a split. Default: 1.
    #[builder(default = 1)]
    pub min_samples_leaf: usize,

    /// Candidate features per split. Default: `Sqrt`.
    #[builder(default)]
    pub max_features: MaxFeatures,

    /// Draw a bootstrap sample per tree. Default: true.
    #[builder(default = true)]
    pub bootstrap: bool,

    /// Base random seed; tree `i` uses a generator derived from `seed` and `i`.
    #[builder(default = 42)]
    pub seed: u64,

    /// Worker threads for fitting (0 = auto). Does not affect the result.
    #[builder(default)]
    pub n_threads: usize,
}

impl<S: forest_config_builder::IsComplete> ForestConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ForestConfigError`] if any parameter is out of range.
    pub fn build(self) -> Result<ForestConfig, ForestConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl ForestConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ForestConfigError> {
        if self.n_trees == 0 {
            return Err(ForestConfigError::InvalidNTrees);
        }
        if self.max_depth == Some(0) {
            return Err(ForestConfigError::InvalidMaxDepth);
        }
        if self.min_samples_split < 2 {
            return Err(ForestConfigError::InvalidMinSamplesSplit(
                self.min_samples_split,
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForestConfigError::InvalidMinSamplesLeaf);
        }
        if self.max_features == MaxFeatures::Fixed(0) {
            return Err(ForestConfigError::InvalidMaxFeatures);
        }
        Ok(())
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
            n_threads: 0,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
