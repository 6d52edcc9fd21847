//! Standardization of feature columns.
//!
//! [`StandardScaler::fit`] captures a per-column mean and population standard
//! deviation. [`ScalerState`] then applies `(x - mean) / scale` using only
//! those captured statistics, never statistics of the data being transformed.
//!
//! # Zero-variance columns
//!
//! A column whose standard deviation is below `f64::EPSILON` is stored with a
//! scale of `1.0`, so it is centered but not divided. Constant sensor columns
//! are therefore accepted rather than rejected.

use ndarray::Axis;
use serde::{Deserialize, Serialize};

use crate::dataset::{FeatureTable, FeatureVector, N_FEATURES, SchemaError, feature_columns};

/// Errors from fitting a scaler.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScalerError {
    #[error("cannot fit a scaler on an empty table")]
    Empty,

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Fits [`ScalerState`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardScaler;

impl StandardScaler {
    /// Compute mean and standard deviation (ddof = 0) per column.
    pub fn fit(table: &FeatureTable) -> Result<ScalerState, ScalerError> {
        table.validate()?;
        if table.is_empty() {
            return Err(ScalerError::Empty);
        }

        let values = table.values();
        let n = values.nrows() as f64;
        let means: Vec<f64> = values
            .axis_iter(Axis(1))
            .map(|col| col.sum() / n)
            .collect();
        let scales: Vec<f64> = values
            .axis_iter(Axis(1))
            .zip(&means)
            .map(|(col, &mean)| {
                let var = col.iter().map(|&x| (x - mean) * (x - mean)).sum::<f64>() / n;
                let std = var.sqrt();
                if std < f64::EPSILON { 1.0 } else { std }
            })
            .collect();

        Ok(ScalerState {
            columns: table.columns().to_vec(),
            means,
            scales,
            n_samples_seen: values.nrows(),
        })
    }
}

/// Fitted standardization statistics.
///
/// Immutable once fitted; shared read-only by inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    columns: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
    n_samples_seen: usize,
}

impl ScalerState {
    /// Column names the statistics were fitted on.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Per-column divisor (standard deviation, or 1.0 for constant columns).
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }

    /// Structural check for states that did not come from [`StandardScaler::fit`],
    /// e.g. after deserialization.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.columns != feature_columns()
            || self.means.len() != N_FEATURES
            || self.scales.len() != N_FEATURES
        {
            return Err(SchemaError::FeatureMismatch {
                expected: feature_columns(),
                got: self.columns.clone(),
            });
        }
        for (i, (&m, &s)) in self.means.iter().zip(&self.scales).enumerate() {
            if !m.is_finite() || !s.is_finite() || s <= 0.0 {
                return Err(SchemaError::NonFinite {
                    row: 0,
                    column: self.columns[i].clone(),
                    value: if m.is_finite() { s } else { m },
                });
            }
        }
        Ok(())
    }

    /// Scale every row of `table`.
    ///
    /// The table must have exactly the columns this state was fitted on, in
    /// the same order. Output has the same shape and header as the input.
    pub fn transform_table(&self, table: &FeatureTable) -> Result<FeatureTable, SchemaError> {
        if table.columns() != self.columns.as_slice() {
            return Err(SchemaError::FeatureMismatch {
                expected: self.columns.clone(),
                got: table.columns().to_vec(),
            });
        }

        let mut out = table.values().to_owned();
        for mut row in out.axis_iter_mut(Axis(0)) {
            for ((x, &m), &s) in row.iter_mut().zip(&self.means).zip(&self.scales) {
                *x = (*x - m) / s;
            }
        }
        FeatureTable::with_columns(self.columns.clone(), out)
    }

    /// Scale one sample.
    pub fn transform_vector(&self, vector: &FeatureVector) -> [f64; N_FEATURES] {
        let mut out = vector.to_array();
        for ((x, &m), &s) in out.iter_mut().zip(&self.means).zip(&self.scales) {
            *x = (*x - m) / s;
        }
        out
    }
}
