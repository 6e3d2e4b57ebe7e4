//! Abstract storage traits for migtrack.
//!
//! The tracking ledger (owned), the schema ledger (the database engine's
//! own version table) and the migration script runner are all reached
//! through these traits. Backends (LMDB, SQLite, in-memory for testing)
//! implement them; the reconciliation and recovery logic depends only on
//! the traits.

pub mod error;
pub mod meta;
pub mod runner;
pub mod schema;
pub mod tracking;

pub use error::StoreError;
pub use meta::MetaStore;
pub use runner::ScriptRunner;
pub use schema::SchemaLedger;
pub use tracking::TrackingStore;
