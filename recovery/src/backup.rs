//! Application database snapshots taken before the first recovery mutation.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use thiserror::Error;

use migtrack_database::{Adapter, DatabaseConfig};
use migtrack_types::Clock;
use migtrack_utils::{run_with_timeout, ProcessError};

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("`{program}` exited unsuccessfully: {stderr}")]
    DumpFailed { program: String, stderr: String },
}

/// Creates at most one backup per instance.
///
/// The first call fixes the target path whether or not it succeeds; later
/// calls report on that path without retrying.
pub struct BackupManager {
    config: DatabaseConfig,
    backup_dir: PathBuf,
    dump_timeout: Duration,
    dump_program: Option<String>,
    attempted: bool,
    backup_path: Option<PathBuf>,
}

impl BackupManager {
    pub fn new(config: DatabaseConfig, backup_dir: impl Into<PathBuf>, dump_timeout: Duration) -> Self {
        Self {
            config,
            backup_dir: backup_dir.into(),
            dump_timeout,
            dump_program: None,
            attempted: false,
            backup_path: None,
        }
    }

    /// Use `program` instead of `pg_dump` / `mysqldump`.
    pub fn with_dump_program(mut self, program: impl Into<String>) -> Self {
        self.dump_program = Some(program.into());
        self
    }

    pub fn backup_path(&self) -> Option<&Path> {
        self.backup_path.as_deref()
    }

    pub fn attempted(&self) -> bool {
        self.attempted
    }

    /// Whether a backup from this session exists on disk.
    pub fn has_backup(&self) -> bool {
        self.backup_path.as_deref().is_some_and(Path::exists)
    }

    /// Snapshot the database, stamping the file name with `clock`.
    /// `Ok(false)` means no backup was produced and
    /// nothing went wrong badly enough to report (in-memory or unsupported
    /// engine, or a dump tool that wrote nothing).
    pub fn create_backup(&mut self, clock: &dyn Clock) -> Result<bool, BackupError> {
        if self.attempted {
            return Ok(self.has_backup());
        }
        self.attempted = true;

        if self.config.is_in_memory() {
            tracing::info!(adapter = %self.config.adapter, "in-memory database, skipping backup");
            return Ok(false);
        }

        let stamp = clock.now().to_compact();
        let path = match self.config.adapter {
            Adapter::Sqlite => {
                let source = PathBuf::from(&self.config.database);
                let stem = source
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("database");
                let ext = source.extension().and_then(|s| s.to_str()).unwrap_or("sqlite3");
                self.backup_dir.join(format!("{stem}_{stamp}.{ext}"))
            }
            Adapter::Postgresql => self.backup_dir.join(format!("{}_{stamp}.dump", self.config.database)),
            Adapter::Mysql => self.backup_dir.join(format!("{}_{stamp}.sql", self.config.database)),
            Adapter::Memory | Adapter::Unsupported => {
                tracing::warn!(adapter = %self.config.adapter, "backups not supported for this adapter");
                return Ok(false);
            }
        };
        self.backup_path = Some(path.clone());
        fs::create_dir_all(&self.backup_dir)?;

        match self.config.adapter {
            Adapter::Sqlite => {
                fs::copy(&self.config.database, &path)?;
            }
            Adapter::Postgresql => self.run_dump(self.pg_dump(&path))?,
            Adapter::Mysql => self.run_dump(self.mysqldump(&path))?,
            Adapter::Memory | Adapter::Unsupported => {}
        }

        if path.exists() {
            tracing::info!(path = %path.display(), "database backup created");
            Ok(true)
        } else {
            tracing::warn!(path = %path.display(), "backup command finished but wrote no file");
            Ok(false)
        }
    }

    fn program(&self, default: &str) -> String {
        self.dump_program.clone().unwrap_or_else(|| default.to_string())
    }

    fn pg_dump(&self, path: &Path) -> Command {
        let mut cmd = Command::new(self.program("pg_dump"));
        cmd.arg("--format=custom").arg(format!("--file={}", path.display()));
        if let Some(host) = &self.config.host {
            cmd.arg(format!("--host={host}"));
        }
        if let Some(port) = self.config.port {
            cmd.arg(format!("--port={port}"));
        }
        if let Some(user) = &self.config.username {
            cmd.arg(format!("--username={user}"));
        }
        if let Some(password) = &self.config.password {
            cmd.env("PGPASSWORD", password);
        }
        cmd.arg(&self.config.database);
        cmd
    }

    fn mysqldump(&self, path: &Path) -> Command {
        let mut cmd = Command::new(self.program("mysqldump"));
        cmd.arg("--single-transaction")
            .arg(format!("--result-file={}", path.display()));
        if let Some(host) = &self.config.host {
            cmd.arg(format!("--host={host}"));
        }
        if let Some(port) = self.config.port {
            cmd.arg(format!("--port={port}"));
        }
        if let Some(user) = &self.config.username {
            cmd.arg(format!("--user={user}"));
        }
        if let Some(password) = &self.config.password {
            cmd.env("MYSQL_PWD", password);
        }
        cmd.arg(&self.config.database);
        cmd
    }

    fn run_dump(&self, cmd: Command) -> Result<(), BackupError> {
        let program = cmd.get_program().to_string_lossy().into_owned();
        tracing::debug!(%program, "running database dump");
        let output = run_with_timeout(cmd, self.dump_timeout)?;
        if !output.success() {
            return Err(BackupError::DumpFailed {
                program,
                stderr: output.stderr_text(),
            });
        }
        Ok(())
    }
}
