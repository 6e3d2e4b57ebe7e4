//! migtrack core: ties the ledgers, the repository and the recovery engine
//! together behind the operations the command line exposes.
//!
//! - [`TrackerConfig`]: TOML configuration with defaults and validation.
//! - [`TrackedRunner`]: runs migration scripts and notifies
//!   [`MigrationObserver`]s; [`TrackingObserver`] keeps the tracking ledger
//!   in step, and a [`BatchSession`] groups warnings for one run.
//! - [`rollback`]: rolling back orphaned or specific migrations.
//! - [`status`], [`ci`], [`doctor`]: read-only reports.
//! - [`recover`]: analyze then recover issue by issue.
//! - [`Workspace`]: opens the real collaborators from a config.

pub mod batch;
pub mod ci;
pub mod config;
pub mod context;
pub mod doctor;
pub mod error;
pub mod observer;
pub mod recover;
pub mod rollback;
pub mod runner;
pub mod status;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::BatchSession;
pub use ci::{run_ci, CiReport, OutputFormat, Strictness};
pub use config::{env_forces_non_interactive, TrackerConfig};
pub use context::TrackerContext;
pub use doctor::{run_doctor, CheckStatus, DoctorCheck, DoctorReport};
pub use error::TrackerError;
pub use observer::{MigrationObserver, MigrationOutcome, TrackingObserver};
pub use recover::{recover, RecoverSummary};
pub use rollback::{rollback_orphaned, rollback_specific, RollbackSummary};
pub use runner::TrackedRunner;
pub use status::{status, StatusReport};
pub use workspace::Workspace;
