//! CSV reading and writing for [`RawTable`].

use std::io;
use std::path::Path;

use super::{RawTable, SchemaError};

/// Errors that can occur when loading or writing a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetLoadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("schema validation failed: {0}")]
    Schema(#[from] SchemaError),
}

/// Read a CSV file with a header row.
///
/// Cells are kept as strings; parsing happens when the table is projected
/// onto the feature schema.
pub fn read_csv(path: impl AsRef<Path>) -> Result<RawTable, DatasetLoadError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path.as_ref())?;
    read_from(reader)
}

/// Read CSV from any reader (used for in-memory uploads).
pub fn read_csv_from<R: io::Read>(reader: R) -> Result<RawTable, DatasetLoadError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    read_from(reader)
}

fn read_from<R: io::Read>(mut reader: csv::Reader<R>) -> Result<RawTable, DatasetLoadError> {
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable::new(columns, rows)?)
}

/// Write a table as CSV with a header row.
pub fn write_csv(path: impl AsRef<Path>, table: &RawTable) -> Result<(), DatasetLoadError> {
    let writer = csv::Writer::from_path(path.as_ref())?;
    write_to(writer, table)
}

/// Write a table as CSV to any writer.
pub fn write_csv_to<W: io::Write>(writer: W, table: &RawTable) -> Result<(), DatasetLoadError> {
    write_to(csv::Writer::from_writer(writer), table)
}

fn write_to<W: io::Write>(mut writer: csv::Writer<W>, table: &RawTable) -> Result<(), DatasetLoadError> {
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
