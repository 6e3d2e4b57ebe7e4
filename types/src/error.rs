//! Parse errors shared across crates.

use thiserror::Error;

/// Raised when an identifier read from config, CLI or storage is unknown.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown migration status: {0}")]
    UnknownStatus(String),

    #[error("unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("unknown recovery option: {0}")]
    UnknownAction(String),

    #[error("unknown strictness: {0} (expected strict, warning or permissive)")]
    UnknownStrictness(String),

    #[error("unknown output format: {0} (expected text or json)")]
    UnknownFormat(String),

    #[error("unknown database adapter: {0}")]
    UnknownAdapter(String),
}
