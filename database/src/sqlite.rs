//! SQLite schema ledger and script runner.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use migtrack_store::{SchemaLedger, ScriptRunner, StoreError};
use migtrack_types::{Direction, MigrationScript};

use crate::DatabaseError;

pub const SCHEMA_MIGRATIONS_TABLE: &str = "schema_migrations";

/// An application database on SQLite.
pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {SCHEMA_MIGRATIONS_TABLE} (version TEXT NOT NULL PRIMARY KEY);"
        ))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("sqlite connection lock poisoned".into()))
    }

    /// Whether a table exists; used by tests and `doctor`.
    pub fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |_| Ok(()),
            )
            .optional()
            .map_err(backend)?;
        Ok(found.is_some())
    }
}

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl SchemaLedger for SqliteDatabase {
    fn versions(&self) -> Result<BTreeSet<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("SELECT version FROM {SCHEMA_MIGRATIONS_TABLE}"))
            .map_err(backend)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(backend)?;
        let mut versions = BTreeSet::new();
        for row in rows {
            versions.insert(row.map_err(backend)?);
        }
        Ok(versions)
    }

    fn contains(&self, version: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                &format!("SELECT 1 FROM {SCHEMA_MIGRATIONS_TABLE} WHERE version = ?1"),
                params![version],
                |_| Ok(()),
            )
            .optional()
            .map_err(backend)?;
        Ok(found.is_some())
    }

    fn insert(&self, version: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            &format!("INSERT OR IGNORE INTO {SCHEMA_MIGRATIONS_TABLE} (version) VALUES (?1)"),
            params![version],
        )
        .map_err(backend)?;
        Ok(())
    }

    fn delete(&self, version: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                &format!("DELETE FROM {SCHEMA_MIGRATIONS_TABLE} WHERE version = ?1"),
                params![version],
            )
            .map_err(backend)?;
        Ok(changed > 0)
    }
}

impl ScriptRunner for SqliteDatabase {
    fn run(&self, script: &MigrationScript, direction: Direction) -> Result<(), StoreError> {
        let sql = script.sql(direction);
        if sql.trim().is_empty() {
            return Err(StoreError::Execution(format!(
                "{} has no {} section",
                script.path.display(),
                direction
            )));
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(backend)?;
        tx.execute_batch(sql)
            .map_err(|e| StoreError::Execution(format!("{} ({direction}): {e}", script.version)))?;
        tx.commit().map_err(backend)?;
        tracing::debug!(version = %script.version, %direction, "migration script executed");
        Ok(())
    }
}
