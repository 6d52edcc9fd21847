//! Schema validation errors shared by training and inference.

/// Input does not match the fixed feature schema.
///
/// Raised before any scaling or classification happens, so a rejected input
/// never produces partial output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required columns {missing:?}; input must contain columns {required:?}")]
    MissingColumns {
        missing: Vec<String>,
        required: Vec<String>,
    },

    #[error(
        "unexpected columns {0:?}; training data must contain exactly the feature columns and the label column"
    )]
    UnexpectedColumns(Vec<String>),

    #[error("duplicate column {0:?}")]
    DuplicateColumn(String),

    #[error("row {row}: invalid value {value:?} in column {column:?}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: non-finite value {value} in column {column:?}")]
    NonFinite {
        row: usize,
        column: String,
        value: f64,
    },

    #[error("row {row}: expected {expected} cells, got {got}")]
    RaggedRow {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("feature columns {got:?} do not match expected columns {expected:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("column {column:?} has {got} values but the table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },
}
