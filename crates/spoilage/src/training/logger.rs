//! Verbosity-gated training progress events.
//!
//! [`TrainingLogger`] decides *whether* a step is reported; `tracing` decides
//! where it goes. Only aggregate figures are logged, never individual
//! feature rows.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::metrics::ClassificationReport;
use crate::persist::format_run_id;

/// How much a training run reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    #[default]
    Silent,
    Warning,
    Info,
    Debug,
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" => Ok(Self::Silent),
            "warning" | "warn" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            other => Err(format!(
                "unknown verbosity {other:?}; expected silent, warning, info or debug"
            )),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Silent => "silent",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// Emits one event per pipeline step when the verbosity allows it.
#[derive(Debug, Clone, Copy)]
pub struct TrainingLogger {
    verbosity: Verbosity,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    #[inline]
    fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity >= level
    }

    pub fn start_training(&self, n_rows: usize, n_classes: usize) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(n_rows, n_classes, "starting training run");
        }
    }

    pub fn log_split(&self, n_train: usize, n_eval: usize, stratified: bool) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(n_train, n_eval, stratified, "split labeled data");
        }
        if n_eval == 0 {
            self.warn("evaluation split is empty; the report will be empty");
        }
    }

    pub fn log_scaler(&self, means: &[f64], scales: &[f64]) {
        if self.enabled(Verbosity::Debug) {
            tracing::debug!(?means, ?scales, "fitted feature scaler");
        }
    }

    pub fn log_fit(&self, kind: &str, elapsed: Duration) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(kind, elapsed_ms = elapsed.as_millis() as u64, "fitted classifier");
        }
    }

    pub fn log_report(&self, report: &ClassificationReport) {
        if !self.enabled(Verbosity::Info) {
            return;
        }
        let metrics: Vec<String> = report.summary_metrics().iter().map(|m| m.to_string()).collect();
        tracing::info!(n_eval = report.n_samples, metrics = %metrics.join(", "), "evaluation");
        if self.enabled(Verbosity::Debug) {
            for class in &report.classes {
                tracing::debug!(
                    label = %class.label,
                    precision = class.precision,
                    recall = class.recall,
                    f1 = class.f1,
                    support = class.support,
                    "per-class metrics"
                );
            }
        }
    }

    pub fn finish_training(&self, run_id: u64) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(run_id = %format_run_id(run_id), "training finished");
        }
    }

    pub fn warn(&self, message: &str) {
        if self.enabled(Verbosity::Warning) {
            tracing::warn!("{message}");
        }
    }
}
