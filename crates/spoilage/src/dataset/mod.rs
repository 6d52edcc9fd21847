//! Feature schema and tabular data.
//!
//! # Key Types
//!
//! - [`FeatureVector`]: one sample's five named sensor readings
//! - [`FeatureTable`]: validated numeric matrix `[n_rows, N_FEATURES]`
//! - [`RawTable`]: string cells as read from CSV, extra columns preserved
//! - [`LabeledDataset`]: features plus labels, the training input
//! - [`SchemaError`]: any mismatch against the fixed schema
//!
//! The schema itself is the pair of constants [`FEATURE_COLUMNS`] and
//! [`LABEL_COLUMN`].
//!
//! # Example
//!
//! ```
//! use spoilage::dataset::{FeatureTable, FeatureVector, FEATURE_COLUMNS};
//!
//! let table = FeatureTable::from_rows(&[FeatureVector::new(50.0, 7.0, 20.0, 50.0, 9.0)]);
//! assert_eq!(table.n_rows(), 1);
//! assert_eq!(table.columns()[4], FEATURE_COLUMNS[4]);
//! ```

mod error;
pub mod io;
mod schema;
mod table;

pub use error::SchemaError;
pub use io::{DatasetLoadError, read_csv, read_csv_from, write_csv, write_csv_to};
pub use schema::{
    FEATURE_COLUMNS, FeatureVector, LABEL_COLUMN, N_FEATURES, feature_columns, matches_schema,
};
pub use table::{FeatureTable, LabeledDataset, RawTable};
