//! Issue detection and guarded recovery.
//!
//! - [`checkers`]: four independent, read-only strategies that each turn a
//!   kind of ledger divergence into [`Issue`](migtrack_types::Issue)s.
//! - [`RecoveryAnalyzer`]: runs every checker and tolerates individual
//!   checker failures.
//! - [`BackupManager`]: snapshots the application database once per session
//!   before the first mutation.
//! - [`RecoveryExecutor`]: resolves an action for an issue and dispatches it,
//!   guarded by backup-first and non-reentrancy rules.
//! - [`actions`]: the handlers; each reports success as a boolean and never
//!   lets an error escape.

pub mod actions;
pub mod analyzer;
pub mod backup;
pub mod checkers;
pub mod context;
pub mod error;
pub mod executor;
pub mod operator;

pub use analyzer::RecoveryAnalyzer;
pub use backup::{BackupError, BackupManager};
pub use checkers::{FileChecker, IssueChecker, RollbackChecker, SchemaChecker, VersionConflictChecker};
pub use context::RecoveryContext;
pub use error::RecoveryError;
pub use executor::RecoveryExecutor;
pub use operator::{LogOperator, Operator, ScriptedOperator};
