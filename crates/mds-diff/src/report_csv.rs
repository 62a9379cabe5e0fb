use crate::record::ChangeRecord;
use std::path::Path;

pub const DEFAULT_REPORT_PATH: &str = "differences.csv";
pub const CSV_HEADER: [&str; 6] = [
    "collection_before",
    "collection_after",
    "doc_id",
    "appl_id",
    "old_value",
    "new_value",
];

#[derive(Debug, thiserror::Error)]
pub enum ReportWriteError {
    #[error("write change report `{path}` failed: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("flush change report `{path}` failed: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Writes the header and one row per record in a single pass; returns the row count.
pub fn write_change_report(path: &Path, records: &[ChangeRecord]) -> Result<usize, ReportWriteError> {
    let csv_error = |source: csv::Error| ReportWriteError::Csv {
        path: path.display().to_string(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for record in records {
        writer.write_record(record.csv_row()).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| ReportWriteError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(records.len())
}

#[cfg(test)]
#[path = "report_csv_test.rs"]
mod tests;
