//! Tracker configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use migtrack_database::{Adapter, DatabaseConfig};
use migtrack_reconcile::Targets;
use migtrack_utils::LogFormat;

use crate::TrackerError;

/// Environment variables that force non-interactive recovery.
pub const NON_INTERACTIVE_VARS: &[&str] = &["MIGTRACK_NON_INTERACTIVE", "MIGTRACK_AUTO_RECOVER", "CI"];

/// Configuration for a migtrack workspace.
///
/// Can be loaded from a TOML file via [`TrackerConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Relative paths resolve against
/// `repo_root`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Root of the git working tree.
    #[serde(default = "default_repo_root")]
    pub repo_root: PathBuf,

    /// Migration script directory, relative to `repo_root`.
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: String,

    /// Trunk branch for single-branch mode and "not in trunk" warnings.
    #[serde(default = "default_main_branch")]
    pub main_branch: String,

    /// Branches that count as authoritative. Empty means trunk only.
    #[serde(default)]
    pub target_branches: Vec<String>,

    /// Tracking ledger directory (LMDB).
    #[serde(default = "default_tracking_dir")]
    pub tracking_dir: PathBuf,

    /// Where database backups are written.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// A rollback idle at least this long is reported as stuck.
    #[serde(default = "default_stuck_rollback_timeout")]
    pub stuck_rollback_timeout_secs: u64,

    /// Kill `git` after this many seconds.
    #[serde(default = "default_vcs_timeout")]
    pub vcs_timeout_secs: u64,

    /// Kill `pg_dump` / `mysqldump` after this many seconds.
    #[serde(default = "default_dump_timeout")]
    pub dump_timeout_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub database: DatabaseConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_repo_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_migrations_dir() -> String {
    "db/migrate".to_string()
}

fn default_main_branch() -> String {
    "main".to_string()
}

fn default_tracking_dir() -> PathBuf {
    PathBuf::from(".migtrack")
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("db/backups")
}

fn default_stuck_rollback_timeout() -> u64 {
    600
}

fn default_vcs_timeout() -> u64 {
    30
}

fn default_dump_timeout() -> u64 {
    300
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl TrackerConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, TrackerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TrackerError::Configuration(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, TrackerError> {
        toml::from_str(s).map_err(|e| TrackerError::Configuration(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, TrackerError> {
        toml::to_string_pretty(self).map_err(|e| TrackerError::Configuration(e.to_string()))
    }

    /// Reject values that would only fail later, mid-run.
    pub fn validate(&self) -> Result<(), TrackerError> {
        let bad = |msg: String| Err(TrackerError::Configuration(msg));
        if self.migrations_dir.trim().is_empty() {
            return bad("migrations_dir must not be empty".into());
        }
        if self.main_branch.trim().is_empty() {
            return bad("main_branch must not be empty".into());
        }
        if self.target_branches.iter().any(|b| b.trim().is_empty()) {
            return bad("target_branches must not contain empty names".into());
        }
        for (name, value) in [
            ("stuck_rollback_timeout_secs", self.stuck_rollback_timeout_secs),
            ("vcs_timeout_secs", self.vcs_timeout_secs),
            ("dump_timeout_secs", self.dump_timeout_secs),
        ] {
            if value == 0 {
                return bad(format!("{name} must be greater than zero"));
            }
        }
        self.log_format
            .parse::<LogFormat>()
            .map_err(TrackerError::Configuration)?;
        if self.database.adapter == Adapter::Unsupported {
            return bad("database.adapter is not one of sqlite, postgresql, mysql, memory".into());
        }
        if !self.database.is_in_memory() && self.database.database.trim().is_empty() {
            return bad("database.database must name a database".into());
        }
        Ok(())
    }

    fn in_repo(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.repo_root.join(path)
        }
    }

    pub fn migrations_path(&self) -> PathBuf {
        self.in_repo(Path::new(&self.migrations_dir))
    }

    pub fn tracking_path(&self) -> PathBuf {
        self.in_repo(&self.tracking_dir)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.in_repo(&self.backup_dir)
    }

    /// Database settings with a relative SQLite path resolved against `repo_root`.
    pub fn resolved_database(&self) -> DatabaseConfig {
        let mut database = self.database.clone();
        if let Some(path) = database.sqlite_path() {
            database.database = self.in_repo(&path).to_string_lossy().into_owned();
        }
        database
    }

    pub fn targets(&self) -> Targets {
        Targets::from_config(&self.main_branch, &self.target_branches)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            repo_root: default_repo_root(),
            migrations_dir: default_migrations_dir(),
            main_branch: default_main_branch(),
            target_branches: Vec::new(),
            tracking_dir: default_tracking_dir(),
            backup_dir: default_backup_dir(),
            stuck_rollback_timeout_secs: default_stuck_rollback_timeout(),
            vcs_timeout_secs: default_vcs_timeout(),
            dump_timeout_secs: default_dump_timeout(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            database: DatabaseConfig::default(),
        }
    }
}

fn truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

/// Whether any of [`NON_INTERACTIVE_VARS`] is set to `1`, `true` or `yes`.
pub fn env_forces_non_interactive(lookup: impl Fn(&str) -> Option<String>) -> bool {
    NON_INTERACTIVE_VARS
        .iter()
        .any(|var| lookup(var).is_some_and(|v| truthy(&v)))
}
