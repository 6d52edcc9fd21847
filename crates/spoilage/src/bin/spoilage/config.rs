//! Run configuration file for the `train` command.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use spoilage::training::Verbosity;
use spoilage::{ForestConfig, TrainingConfig};

/// Contents of a run configuration TOML file.
///
/// ```toml
/// [training]
/// test_fraction = 0.2
/// seed = 42
///
/// [forest]
/// n_trees = 200
/// max_features = "sqrt"
/// ```
///
/// Both sections and every key are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub training: TrainingConfig,
    pub forest: ForestConfig,
    /// Whether `[training] verbosity` was written in the file.
    #[serde(skip)]
    verbosity_set: bool,
}

impl RunConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let raw: toml::Table = toml::from_str(text)?;
        let verbosity_set = raw
            .get("training")
            .and_then(|training| training.get("verbosity"))
            .is_some();
        let mut config: Self = toml::Value::Table(raw).try_into()?;
        config.verbosity_set = verbosity_set;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Apply command line flags on top of the file.
    ///
    /// Flags win over the file. Without a flag or a file value the CLI
    /// trains at `info` verbosity.
    pub fn apply_overrides(
        &mut self,
        seed: Option<u64>,
        trees: Option<usize>,
        verbosity: Option<Verbosity>,
    ) {
        if let Some(seed) = seed {
            self.training.seed = seed;
            self.forest.seed = seed;
        }
        if let Some(trees) = trees {
            self.forest.n_trees = trees;
        }
        if let Some(verbosity) = verbosity {
            self.training.verbosity = verbosity;
        } else if !self.verbosity_set {
            self.training.verbosity = Verbosity::Info;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.training.validate()?;
        self.forest.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spoilage::model::MaxFeatures;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(RunConfig::from_toml("").unwrap(), RunConfig::default());
    }

    #[test]
    fn sections_override_defaults() {
        let config = RunConfig::from_toml(
            r#"
            [training]
            seed = 7
            stratify = false

            [forest]
            n_trees = 10
            max_depth = 4
            max_features = "all"
            "#,
        )
        .unwrap();
        assert_eq!(config.training.seed, 7);
        assert!(!config.training.stratify);
        assert_eq!(config.training.test_fraction, 0.2);
        assert_eq!(config.forest.n_trees, 10);
        assert_eq!(config.forest.max_depth, Some(4));
        assert_eq!(config.forest.max_features, MaxFeatures::All);
    }

    #[test]
    fn file_verbosity_survives_without_flag() {
        let mut config = RunConfig::from_toml("[training]\nverbosity = \"debug\"\n").unwrap();
        config.apply_overrides(None, None, None);
        assert_eq!(config.training.verbosity, Verbosity::Debug);

        let mut config = RunConfig::from_toml("[training]\nverbosity = \"silent\"\n").unwrap();
        config.apply_overrides(None, None, None);
        assert_eq!(config.training.verbosity, Verbosity::Silent);
    }

    #[test]
    fn verbosity_flag_beats_file() {
        let mut config = RunConfig::from_toml("[training]\nverbosity = \"debug\"\n").unwrap();
        config.apply_overrides(None, None, Some(Verbosity::Warning));
        assert_eq!(config.training.verbosity, Verbosity::Warning);
    }

    #[test]
    fn verbosity_defaults_to_info_when_unset() {
        let mut config = RunConfig::from_toml("[training]\nseed = 3\n").unwrap();
        config.apply_overrides(None, None, None);
        assert_eq!(config.training.verbosity, Verbosity::Info);

        let mut config = RunConfig::default();
        config.apply_overrides(Some(11), Some(5), None);
        assert_eq!(config.training.verbosity, Verbosity::Info);
        assert_eq!(config.training.seed, 11);
        assert_eq!(config.forest.seed, 11);
        assert_eq!(config.forest.n_trees, 5);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(RunConfig::from_toml("[training]\ntest_fraction = 1.5\n").is_err());
        assert!(RunConfig::from_toml("[forest]\nn_trees = 0\n").is_err());
        assert!(RunConfig::from_toml("[model]\nn_trees = 3\n").is_err());
    }
}
