//! Migration script execution trait.

use migtrack_types::{Direction, MigrationScript};

use crate::StoreError;

/// Executes one direction of a migration script against the database.
///
/// This only runs the SQL; keeping the schema and tracking ledgers in step
/// is the caller's job.
pub trait ScriptRunner: Send + Sync {
    fn run(&self, script: &MigrationScript, direction: Direction) -> Result<(), StoreError>;
}
