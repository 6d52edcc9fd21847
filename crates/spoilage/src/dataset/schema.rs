//! The fixed feature schema.
//!
//! Column names and their order are shared by the training and inference
//! pipelines. They are constants, not configuration: a scaler fitted on one
//! column order cannot be applied to another.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SchemaError;

/// Number of sensor features per sample.
pub const N_FEATURES: usize = 5;

/// Feature column names, in model order.
pub const FEATURE_COLUMNS: [&str; N_FEATURES] =
    ["Moisture", "pH", "Temperature", "Humidity", "Bacterial_Growth"];

/// Name of the label column in training data and of the prediction column
/// appended to batch output.
pub const LABEL_COLUMN: &str = "Spoilage_Status";

/// Feature column names as owned strings (for error messages and table headers).
pub fn feature_columns() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// Returns true if `columns` is exactly the feature schema, in order.
pub fn matches_schema(columns: &[String]) -> bool {
    columns.len() == N_FEATURES
        && columns
            .iter()
            .zip(FEATURE_COLUMNS.iter())
            .all(|(a, b)| a == b)
}

/// One sample's five sensor readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(rename = "Moisture")]
    pub moisture: f64,
    #[serde(rename = "pH")]
    pub ph: f64,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "Humidity")]
    pub humidity: f64,
    #[serde(rename = "Bacterial_Growth")]
    pub bacterial_growth: f64,
}

impl FeatureVector {
    pub fn new(
        moisture: f64,
        ph: f64,
        temperature: f64,
        humidity: f64,
        bacterial_growth: f64,
    ) -> Self {
        Self {
            moisture,
            ph,
            temperature,
            humidity,
            bacterial_growth,
        }
    }

    /// Values in [`FEATURE_COLUMNS`] order.
    pub fn to_array(&self) -> [f64; N_FEATURES] {
        [
            self.moisture,
            self.ph,
            self.temperature,
            self.humidity,
            self.bacterial_growth,
        ]
    }

    /// Build from values in [`FEATURE_COLUMNS`] order.
    pub fn from_array(values: [f64; N_FEATURES]) -> Self {
        let [moisture, ph, temperature, humidity, bacterial_growth] = values;
        Self::new(moisture, ph, temperature, humidity, bacterial_growth)
    }

    /// Build from named fields.
    ///
    /// Every schema column must be present. Extra keys are ignored, matching
    /// how batch input passes unknown columns through.
    pub fn from_record(record: &BTreeMap<String, f64>) -> Result<Self, SchemaError> {
        let missing: Vec<String> = FEATURE_COLUMNS
            .iter()
            .filter(|c| !record.contains_key(**c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns {
                missing,
                required: feature_columns(),
            });
        }

        let mut values = [0.0; N_FEATURES];
        for (slot, column) in values.iter_mut().zip(FEATURE_COLUMNS.iter()) {
            *slot = record[*column];
        }
        let vector = Self::from_array(values);
        vector.validate()?;
        Ok(vector)
    }

    /// Reject NaN and infinite readings.
    pub fn validate(&self) -> Result<(), SchemaError> {
        validate_row(0, &self.to_array())
    }
}

impl From<[f64; N_FEATURES]> for FeatureVector {
    fn from(values: [f64; N_FEATURES]) -> Self {
        Self::from_array(values)
    }
}

pub(crate) fn validate_row(row: usize, values: &[f64]) -> Result<(), SchemaError> {
    for (value, column) in values.iter().zip(FEATURE_COLUMNS.iter()) {
        if !value.is_finite() {
            return Err(SchemaError::NonFinite {
                row,
                column: column.to_string(),
                value: *value,
            });
        }
    }
    Ok(())
}
