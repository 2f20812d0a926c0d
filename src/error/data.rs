use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Missing field '{field}' in result line '{line}'.")]
    MissingField { field: &'static str, line: String },
    #[error("Unexpected trailing fields in result line '{line}'.")]
    TrailingFields { line: String },
    #[error("Invalid value '{value}' for field '{field}': {source}")]
    InvalidInteger {
        field: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Invalid timestamp '{value}'. Expected '<seconds>[.<fraction>]'.")]
    InvalidTimestamp { value: String },
    #[error("Timestamp '{value}' is out of range.")]
    TimestampOutOfRange { value: String },
    #[error("Batch from '{source_label}' is not ordered by timestamp.")]
    UnorderedBatch { source_label: String },
    #[error("I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}
