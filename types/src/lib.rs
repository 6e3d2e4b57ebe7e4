//! Fundamental types for migtrack.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: tracking records and their statuses, issues and their
//! recovery actions, migration scripts, and timestamps.

pub mod action;
pub mod error;
pub mod issue;
pub mod record;
pub mod script;
pub mod status;
pub mod time;

pub use action::RecoveryAction;
pub use error::ParseError;
pub use issue::{Issue, IssueKind, Severity};
pub use record::{meta_keys, Metadata, NewTrackingRecord, RecordId, TrackingRecord};
pub use script::{Direction, MigrationScript};
pub use status::MigrationStatus;
pub use time::{Clock, SystemClock, Timestamp};
