//! Database-side collaborators.
//!
//! - [`DatabaseConfig`]: which engine the application uses and how to reach it.
//! - [`MigrationScripts`]: the on-disk migration directory.
//! - [`SqliteDatabase`]: schema ledger and script runner for SQLite.
//!
//! Networked engines are only reached through their dump tools (for
//! backups); migtrack does not ship a client for them.

pub mod config;
pub mod error;
pub mod scripts;
pub mod sqlite;

pub use config::{Adapter, DatabaseConfig};
pub use error::DatabaseError;
pub use scripts::{MigrationScripts, ScriptFile};
pub use sqlite::SqliteDatabase;
