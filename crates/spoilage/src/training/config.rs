//! Training pipeline configuration.

use bon::Builder;
use serde::{Deserialize, Serialize};

use super::logger::Verbosity;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Evaluation fraction must be in (0, 1).
    InvalidTestFraction(f64),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTestFraction(v) => {
                write!(f, "test_fraction must be in (0, 1), got {}", v)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// TrainingConfig
// =============================================================================

/// How the labeled data is split and how verbose a run is.
///
/// Classifier hyperparameters live with the trainer (see
/// [`ForestConfig`](crate::model::ForestConfig)).
///
/// ```
/// use spoilage::training::{TrainingConfig, Verbosity};
///
/// let config = TrainingConfig::builder()
///     .test_fraction(0.25)
///     .verbosity(Verbosity::Info)
///     .build()
///     .unwrap();
/// assert_eq!(config.seed, 42);
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation. Default: 0.2.
    #[builder(default = 0.2)]
    pub test_fraction: f64,

    /// Seed for the train/evaluation split. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    /// Split each class separately so both splits keep the class mix.
    /// Default: true.
    #[builder(default = true)]
    pub stratify: bool,

    /// Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

impl<S: training_config_builder::IsComplete> TrainingConfigBuilder<S> {
    /// Build and validate the configuration.
    pub fn build(self) -> Result<TrainingConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ConfigError::InvalidTestFraction(self.test_fraction));
        }
        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            stratify: true,
            verbosity: Verbosity::Silent,
        }
    }
}
