//! Production wiring: LMDB tracking ledger, SQLite schema ledger, git.

use std::time::Duration;

use migtrack_database::{Adapter, DatabaseError, MigrationScripts, SqliteDatabase};
use migtrack_recovery::BackupManager;
use migtrack_store_lmdb::integrity::check_data_dir;
use migtrack_store_lmdb::{check_integrity, IntegrityReport, LmdbEnvironment, LmdbTrackingStore};
use migtrack_types::SystemClock;
use migtrack_vcs::GitClient;

use crate::{run_doctor, DoctorReport, TrackerConfig, TrackerContext, TrackerError};

/// Everything a command needs, opened from one [`TrackerConfig`].
pub struct Workspace {
    config: TrackerConfig,
    env: LmdbEnvironment,
    tracking: LmdbTrackingStore,
    database: SqliteDatabase,
    vcs: GitClient,
    scripts: MigrationScripts,
    clock: SystemClock,
}

impl Workspace {
    /// Validate `config` and open both ledgers.
    ///
    /// Only SQLite (file or in-memory) has a schema ledger driver; other
    /// engines are rejected here even though they can still be backed up.
    pub fn open(config: TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;

        let tracking_path = config.tracking_path();
        check_data_dir(&tracking_path).map_err(TrackerError::Configuration)?;
        let env = LmdbEnvironment::open(&tracking_path, LmdbEnvironment::DEFAULT_MAP_SIZE)?;
        let tracking = env.tracking_store();

        let resolved = config.resolved_database();
        let database = match resolved.sqlite_path() {
            Some(path) => SqliteDatabase::open(&path)?,
            None if resolved.is_in_memory() => SqliteDatabase::open_in_memory()?,
            None => return Err(DatabaseError::UnsupportedAdapter(resolved.adapter.to_string()).into()),
        };

        let vcs = GitClient::new(
            &config.repo_root,
            &config.migrations_dir,
            Duration::from_secs(config.vcs_timeout_secs),
        );
        let scripts = MigrationScripts::new(config.migrations_path());

        tracing::info!(
            tracking = %tracking_path.display(),
            adapter = %resolved.adapter,
            repo = %config.repo_root.display(),
            "workspace opened"
        );
        Ok(Self {
            config,
            env,
            tracking,
            database,
            vcs,
            scripts,
            clock: SystemClock,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn context(&self) -> TrackerContext<'_> {
        TrackerContext {
            config: &self.config,
            tracking: &self.tracking,
            schema: &self.database,
            runner: &self.database,
            vcs: &self.vcs,
            scripts: &self.scripts,
            clock: &self.clock,
        }
    }

    /// A fresh backup manager; each recovery session takes at most one backup.
    pub fn backup_manager(&self) -> BackupManager {
        BackupManager::new(
            self.config.resolved_database(),
            self.config.backup_path(),
            Duration::from_secs(self.config.dump_timeout_secs),
        )
    }

    pub fn integrity(&self) -> Result<IntegrityReport, TrackerError> {
        Ok(check_integrity(self.env.env())?)
    }

    /// Doctor checks plus the tracking ledger's integrity scan.
    pub fn doctor(&self) -> DoctorReport {
        let integrity = match self.integrity() {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!(error = %e, "integrity scan failed");
                None
            }
        };
        run_doctor(&self.context(), integrity.as_ref())
    }

    /// Whether backups of this engine need an external dump tool.
    pub fn uses_dump_tool(&self) -> bool {
        matches!(self.config.database.adapter, Adapter::Postgresql | Adapter::Mysql)
    }
}
