//! Reconciliation of the tracking ledger against branch inventories.
//!
//! Answers three read-only questions: which applied migrations are absent
//! from every target branch (orphaned), which migrations in a target branch
//! were never run locally (missing), and how many applied migrations are
//! accounted for (synced).

pub mod error;
pub mod reporter;

pub use error::ReconcileError;
pub use reporter::{Missing, ReconciliationReporter, ReconciliationSummary, Targets};
