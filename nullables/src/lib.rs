//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator (clock, tracking ledger, schema ledger,
//! script runner, version control) is abstracted behind a trait. This
//! crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically, including forced failures
//! - Never touch the filesystem, a database or a subprocess
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod store;
pub mod vcs;

pub use clock::NullClock;
pub use store::{NullSchemaLedger, NullScriptRunner, NullTrackingStore};
pub use vcs::NullVcs;
