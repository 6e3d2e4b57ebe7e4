//! Database connection settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use migtrack_types::ParseError;

/// The database engine the application runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adapter {
    #[serde(alias = "sqlite3")]
    Sqlite,
    #[serde(alias = "postgres", alias = "postgis")]
    Postgresql,
    #[serde(alias = "mysql2", alias = "trilogy")]
    Mysql,
    Memory,
    /// Any engine name this tool has no support for.
    #[serde(other)]
    Unsupported,
}

impl Adapter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgresql => "postgresql",
            Self::Mysql => "mysql",
            Self::Memory => "memory",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Adapter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgresql" | "postgres" | "postgis" => Ok(Self::Postgresql),
            "mysql" | "mysql2" | "trilogy" => Ok(Self::Mysql),
            "memory" => Ok(Self::Memory),
            other => Err(ParseError::UnknownAdapter(other.to_string())),
        }
    }
}

/// How to reach the application database.
///
/// For SQLite `database` is a file path; for networked engines it is the
/// database name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_adapter")]
    pub adapter: Adapter,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

fn default_adapter() -> Adapter {
    Adapter::Sqlite
}

fn default_database() -> String {
    "db/development.sqlite3".to_string()
}

impl DatabaseConfig {
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            adapter: Adapter::Sqlite,
            database: path.into(),
            ..Default::default()
        }
    }

    pub fn memory() -> Self {
        Self {
            adapter: Adapter::Memory,
            database: ":memory:".to_string(),
            ..Default::default()
        }
    }

    /// Nothing on disk to back up.
    pub fn is_in_memory(&self) -> bool {
        self.adapter == Adapter::Memory || self.database == ":memory:"
    }

    /// File path of a SQLite database.
    pub fn sqlite_path(&self) -> Option<PathBuf> {
        (self.adapter == Adapter::Sqlite && !self.is_in_memory())
            .then(|| PathBuf::from(&self.database))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            adapter: default_adapter(),
            database: default_database(),
            host: None,
            port: None,
            username: None,
            password: None,
        }
    }
}
