//! Evaluation metrics for the held-out split.
//!
//! # Key Types
//!
//! - [`ClassificationReport`]: accuracy, per-class precision/recall/F1,
//!   macro and weighted averages, and the confusion matrix
//! - [`MetricValue`]: a named scalar for logs and summaries
//!
//! All ratios with a zero denominator are reported as 0.0.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ClassId;

// =============================================================================
// MetricValue
// =============================================================================

/// A computed metric value with its name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub name: String,
    pub value: f64,
}

impl MetricValue {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.6}", self.name, self.value)
    }
}

// =============================================================================
// ClassificationReport
// =============================================================================

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of evaluation rows whose true class is this one.
    pub support: usize,
}

/// Precision, recall and F1 averaged over classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Evaluation summary handed to reporting tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub n_samples: usize,
    pub accuracy: f64,
    /// One entry per codec class, in class id order.
    pub classes: Vec<ClassMetrics>,
    pub macro_avg: AveragedMetrics,
    /// Averages weighted by support.
    pub weighted_avg: AveragedMetrics,
    /// `confusion[truth][predicted]` counts.
    pub confusion: Vec<Vec<usize>>,
}

#[inline]
fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

impl ClassificationReport {
    /// Compare true and predicted ids for classes named by `labels`.
    ///
    /// Ids outside `labels` are ignored. Empty input yields a report with
    /// zero support everywhere and accuracy 0.0.
    pub fn compute(labels: &[String], truth: &[ClassId], predicted: &[ClassId]) -> Self {
        debug_assert_eq!(truth.len(), predicted.len());
        let k = labels.len();
        let mut confusion = vec![vec![0usize; k]; k];
        let mut n_samples = 0;
        let mut correct = 0;
        for (t, p) in truth.iter().zip(predicted) {
            let (t, p) = (t.index(), p.index());
            if t < k && p < k {
                confusion[t][p] += 1;
                n_samples += 1;
                if t == p {
                    correct += 1;
                }
            }
        }

        let classes: Vec<ClassMetrics> = labels
            .iter()
            .enumerate()
            .map(|(c, label)| {
                let tp = confusion[c][c] as f64;
                let support: usize = confusion[c].iter().sum();
                let predicted_c: usize = confusion.iter().map(|row| row[c]).sum();
                let precision = ratio(tp, predicted_c as f64);
                let recall = ratio(tp, support as f64);
                ClassMetrics {
                    label: label.clone(),
                    precision,
                    recall,
                    f1: ratio(2.0 * precision * recall, precision + recall),
                    support,
                }
            })
            .collect();

        let macro_avg = if k == 0 {
            AveragedMetrics::default()
        } else {
            let kf = k as f64;
            AveragedMetrics {
                precision: classes.iter().map(|c| c.precision).sum::<f64>() / kf,
                recall: classes.iter().map(|c| c.recall).sum::<f64>() / kf,
                f1: classes.iter().map(|c| c.f1).sum::<f64>() / kf,
            }
        };

        let total = n_samples as f64;
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            ratio(
                classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>(),
                total,
            )
        };
        let weighted_avg = AveragedMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
        };

        Self {
            n_samples,
            accuracy: ratio(correct as f64, total),
            classes,
            macro_avg,
            weighted_avg,
            confusion,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.n_samples == 0
    }

    /// Headline figures: accuracy and macro/weighted F1.
    pub fn summary_metrics(&self) -> Vec<MetricValue> {
        vec![
            MetricValue::new("accuracy", self.accuracy),
            MetricValue::new("macro-f1", self.macro_avg.f1),
            MetricValue::new("weighted-f1", self.weighted_avg.f1),
        ]
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(0);

        writeln!(f, "accuracy: {:.4} ({} samples)", self.accuracy, self.n_samples)?;
        writeln!(
            f,
            "{:>width$}  {:>9}  {:>9}  {:>9}  {:>7}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$}  {:>9.2}  {:>9.2}  {:>9.2}  {:>7}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        for (name, avg) in [("macro avg", self.macro_avg), ("weighted avg", self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$}  {:>9.2}  {:>9.2}  {:>9.2}  {:>7}",
                name, avg.precision, avg.recall, avg.f1, self.n_samples
            )?;
        }
        Ok(())
    }
}
