//! Lifecycle status of a tracked migration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ParseError;

/// The lifecycle status stored on every tracking record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    /// Ran forward successfully.
    Applied,
    /// Ran backward successfully (or was force-marked).
    RolledBack,
    /// A rollback started and has not finished yet.
    RollingBack,
    /// Applied locally but absent from every target branch.
    Orphaned,
    /// Confirmed present in a target branch.
    Synced,
    /// Closed out by an operator via a recovery action.
    Resolved,
}

impl MigrationStatus {
    pub const ALL: [MigrationStatus; 6] = [
        Self::Applied,
        Self::RolledBack,
        Self::RollingBack,
        Self::Orphaned,
        Self::Synced,
        Self::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::RolledBack => "rolled_back",
            Self::RollingBack => "rolling_back",
            Self::Orphaned => "orphaned",
            Self::Synced => "synced",
            Self::Resolved => "resolved",
        }
    }

    /// Statuses whose migration script is expected to be on disk.
    pub fn expects_script(&self) -> bool {
        matches!(self, Self::Applied | Self::RollingBack)
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseError::UnknownStatus(s.to_string()))
    }
}
