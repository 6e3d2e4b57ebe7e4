//! Issue checkers.
//!
//! Each checker is a read-only strategy over the ledgers and the script
//! directory. Checkers never mutate anything and never see each other's
//! output; the analyzer runs them in a fixed order and concatenates.

mod file;
mod rollback;
mod schema;
mod version_conflict;

pub use file::FileChecker;
pub use rollback::RollbackChecker;
pub use schema::SchemaChecker;
pub use version_conflict::VersionConflictChecker;

use migtrack_types::Issue;

use crate::RecoveryError;

/// A detection strategy producing zero or more issues.
pub trait IssueChecker {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    fn check(&self) -> Result<Vec<Issue>, RecoveryError>;
}
