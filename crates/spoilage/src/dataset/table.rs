//! Tabular containers.
//!
//! - [`RawTable`]: header plus string cells, exactly as read from CSV. Columns
//!   outside the schema are preserved so batch output can re-attach them.
//! - [`FeatureTable`]: validated, row-major numeric matrix `[n_rows, N_FEATURES]`.
//! - [`LabeledDataset`]: features plus one string label per row (training input).

use std::collections::HashSet;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use super::schema::{
    FEATURE_COLUMNS, FeatureVector, LABEL_COLUMN, N_FEATURES, feature_columns, matches_schema,
    validate_row,
};
use super::SchemaError;

// =============================================================================
// FeatureTable
// =============================================================================

/// Numeric feature matrix with named columns.
///
/// Tables built through [`FeatureTable::from_rows`] or [`RawTable::feature_table`]
/// always carry the fixed schema. [`FeatureTable::with_columns`] allows any
/// header so that callers holding mislabeled data get a [`SchemaError`] at
/// scoring time instead of silently wrong predictions.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl FeatureTable {
    /// Table with zero rows and the fixed schema.
    pub fn empty() -> Self {
        Self {
            columns: feature_columns(),
            values: Array2::zeros((0, N_FEATURES)),
        }
    }

    pub fn from_rows(rows: &[FeatureVector]) -> Self {
        let mut values = Array2::zeros((rows.len(), N_FEATURES));
        for (mut dst, row) in values.axis_iter_mut(Axis(0)).zip(rows) {
            dst.assign(&ArrayView1::from(&row.to_array()));
        }
        Self {
            columns: feature_columns(),
            values,
        }
    }

    /// Wrap a `[n_rows, N_FEATURES]` matrix whose columns follow the schema order.
    pub fn from_array(values: Array2<f64>) -> Result<Self, SchemaError> {
        Self::with_columns(feature_columns(), values)
    }

    /// Wrap a matrix with an explicit header.
    ///
    /// Only checks that the header length matches the matrix width; schema
    /// conformance is checked by [`validate`](Self::validate).
    pub fn with_columns(columns: Vec<String>, values: Array2<f64>) -> Result<Self, SchemaError> {
        if columns.len() != values.ncols() {
            return Err(SchemaError::LengthMismatch {
                column: "<header>".to_string(),
                expected: values.ncols(),
                got: columns.len(),
            });
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    /// Row `index` as a [`FeatureVector`], if the table follows the schema.
    pub fn row(&self, index: usize) -> Option<FeatureVector> {
        if !matches_schema(&self.columns) || index >= self.n_rows() {
            return None;
        }
        let row = self.values.row(index);
        Some(FeatureVector::new(row[0], row[1], row[2], row[3], row[4]))
    }

    /// New table holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }

    /// Check the header against the schema and every value for finiteness.
    ///
    /// All-or-nothing: the first offending column or cell rejects the table.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if !matches_schema(&self.columns) {
            let missing: Vec<String> = FEATURE_COLUMNS
                .iter()
                .filter(|c| !self.columns.iter().any(|h| h == *c))
                .map(|c| c.to_string())
                .collect();
            return Err(if missing.is_empty() {
                SchemaError::FeatureMismatch {
                    expected: feature_columns(),
                    got: self.columns.clone(),
                }
            } else {
                SchemaError::MissingColumns {
                    missing,
                    required: feature_columns(),
                }
            });
        }
        for (i, row) in self.values.axis_iter(Axis(0)).enumerate() {
            validate_row(i, &row.to_vec())?;
        }
        Ok(())
    }
}

// =============================================================================
// LabeledDataset
// =============================================================================

/// Training input: features plus one label per row.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    features: FeatureTable,
    labels: Vec<String>,
}

impl LabeledDataset {
    pub fn new(features: FeatureTable, labels: Vec<String>) -> Result<Self, SchemaError> {
        if features.n_rows() != labels.len() {
            return Err(SchemaError::LengthMismatch {
                column: LABEL_COLUMN.to_string(),
                expected: features.n_rows(),
                got: labels.len(),
            });
        }
        features.validate()?;
        Ok(Self { features, labels })
    }

    pub fn features(&self) -> &FeatureTable {
        &self.features
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }
}

// =============================================================================
// RawTable
// =============================================================================

/// Header plus string cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table, rejecting duplicate headers and ragged rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(SchemaError::DuplicateColumn(column.clone()));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(SchemaError::RaggedRow {
                    row: i,
                    expected: columns.len(),
                    got: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Render a feature table (plus optional labels) as string cells.
    ///
    /// Labels, when given, must have one entry per feature row.
    pub fn from_features(
        features: &FeatureTable,
        labels: Option<&[String]>,
    ) -> Result<Self, SchemaError> {
        let mut columns = features.columns().to_vec();
        if let Some(labels) = labels {
            if labels.len() != features.n_rows() {
                return Err(SchemaError::LengthMismatch {
                    column: LABEL_COLUMN.to_string(),
                    expected: features.n_rows(),
                    got: labels.len(),
                });
            }
            columns.push(LABEL_COLUMN.to_string());
        }
        let rows = features
            .values()
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(i, row)| {
                let mut cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                if let Some(labels) = labels {
                    cells.push(labels[i].clone());
                }
                cells
            })
            .collect();
        Ok(Self { columns, rows })
    }

    /// Training table from `(reading, label)` pairs: the five feature
    /// columns followed by the label column.
    pub fn from_labeled_vectors<'a>(
        rows: impl IntoIterator<Item = (FeatureVector, &'a str)>,
    ) -> Self {
        let mut columns = feature_columns();
        columns.push(LABEL_COLUMN.to_string());
        let rows = rows
            .into_iter()
            .map(|(vector, label)| {
                let mut cells: Vec<String> =
                    vector.to_array().iter().map(|v| v.to_string()).collect();
                cells.push(label.to_string());
                cells
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Schema columns absent from this table.
    pub fn missing_features(&self) -> Vec<String> {
        FEATURE_COLUMNS
            .iter()
            .filter(|c| self.column_index(c).is_none())
            .map(|c| c.to_string())
            .collect()
    }

    /// Project and parse the five feature columns.
    ///
    /// Other columns are ignored. Any missing column or unparsable cell rejects
    /// the whole table.
    pub fn feature_table(&self) -> Result<FeatureTable, SchemaError> {
        let missing = self.missing_features();
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns {
                missing,
                required: feature_columns(),
            });
        }

        let indices: Vec<usize> = FEATURE_COLUMNS
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect();

        let mut values = Array2::zeros((self.rows.len(), N_FEATURES));
        for (i, row) in self.rows.iter().enumerate() {
            for (j, &col) in indices.iter().enumerate() {
                values[[i, j]] = parse_cell(i, FEATURE_COLUMNS[j], &row[col])?;
            }
        }

        FeatureTable::from_array(values)
    }

    /// Parse a training table: exactly the five features plus the label column.
    pub fn labeled_dataset(&self) -> Result<LabeledDataset, SchemaError> {
        let mut missing = self.missing_features();
        if self.column_index(LABEL_COLUMN).is_none() {
            missing.push(LABEL_COLUMN.to_string());
        }
        if !missing.is_empty() {
            let mut required = feature_columns();
            required.push(LABEL_COLUMN.to_string());
            return Err(SchemaError::MissingColumns { missing, required });
        }

        let unexpected: Vec<String> = self
            .columns
            .iter()
            .filter(|c| c.as_str() != LABEL_COLUMN && !FEATURE_COLUMNS.contains(&c.as_str()))
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            return Err(SchemaError::UnexpectedColumns(unexpected));
        }

        let features = self.feature_table()?;
        let label_idx = self.column_index(LABEL_COLUMN).unwrap_or_default();
        let mut labels = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            let label = row[label_idx].trim();
            if label.is_empty() {
                return Err(SchemaError::InvalidValue {
                    row: i,
                    column: LABEL_COLUMN.to_string(),
                    value: row[label_idx].clone(),
                });
            }
            labels.push(label.to_string());
        }

        LabeledDataset::new(features, labels)
    }

    /// Append a column, or overwrite it if a column of that name exists.
    pub fn with_column(mut self, name: &str, values: Vec<String>) -> Result<Self, SchemaError> {
        if values.len() != self.rows.len() {
            return Err(SchemaError::LengthMismatch {
                column: name.to_string(),
                expected: self.rows.len(),
                got: values.len(),
            });
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(self)
    }
}

fn parse_cell(row: usize, column: &str, cell: &str) -> Result<f64, SchemaError> {
    let value: f64 = cell.trim().parse().map_err(|_| SchemaError::InvalidValue {
        row,
        column: column.to_string(),
        value: cell.to_string(),
    })?;
    if !value.is_finite() {
        return Err(SchemaError::NonFinite {
            row,
            column: column.to_string(),
            value,
        });
    }
    Ok(value)
}
