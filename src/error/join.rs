use thiserror::Error;

#[derive(Debug, Error)]
pub enum JoinError {
    #[error(
        "Source '{source_label}' delivered a row for bucket {key} after buckets up to {emitted_through} were emitted."
    )]
    LateRow {
        source_label: String,
        key: i64,
        emitted_through: i64,
    },
    #[error("Duplicate source label '{label}'.")]
    DuplicateSource { label: String },
}
