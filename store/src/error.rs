use thiserror::Error;

/// Failures surfaced by the tracking store, schema ledger and script runner.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} does not exist")]
    NotFound(String),

    #[error("ledger backend error: {0}")]
    Backend(String),

    #[error("could not encode or decode a record: {0}")]
    Serialization(String),

    #[error("tracking ledger is corrupted: {0}")]
    Corruption(String),

    #[error("migration script failed: {0}")]
    Execution(String),
}
