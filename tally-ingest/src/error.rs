use thiserror::Error;

/// Failures while ingesting an uploaded bank-statement CSV.
///
/// Row validation is fail-fast: the first invalid row aborts the whole
/// ingest, carrying its 1-based index.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("CSV file is empty")]
    EmptyFile,

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row}: {reason}")]
    Row { row: usize, reason: String },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
}
