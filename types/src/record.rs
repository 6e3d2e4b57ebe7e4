//! Tracking ledger row type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{MigrationStatus, Timestamp};

/// Free-form string metadata attached to a tracking record.
pub type Metadata = BTreeMap<String, String>;

/// Well-known metadata keys written by recovery actions.
pub mod meta_keys {
    pub const RECOVERY_ACTION: &str = "recovery_action";
    pub const RECOVERED_AT: &str = "recovered_at";
    pub const WARNING: &str = "warning";
    pub const CONSOLIDATED_AT: &str = "consolidated_at";
    pub const CONSOLIDATED_FROM: &str = "consolidated_from";
    pub const CONSOLIDATED_FROM_COUNT: &str = "consolidated_from_count";
    pub const PLACEHOLDER_CREATED: &str = "placeholder_created";
    pub const SOURCE: &str = "source";
}

/// Store-assigned identifier of a tracking record.
///
/// Versions are not unique keys (a version conflict is exactly two records
/// sharing one), so records are addressed by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One row of the tracking ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub id: RecordId,
    pub version: String,
    pub status: MigrationStatus,
    pub branch: Option<String>,
    pub author: Option<String>,
    pub metadata: Metadata,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TrackingRecord {
    /// Set a new status and bump `updated_at`.
    pub fn transition(&mut self, status: MigrationStatus, now: Timestamp) {
        self.status = status;
        self.updated_at = now;
    }

    /// Record which recovery action touched this row and when.
    pub fn stamp_recovery(&mut self, action: &str, now: Timestamp) {
        self.metadata
            .insert(meta_keys::RECOVERY_ACTION.to_string(), action.to_string());
        self.metadata
            .insert(meta_keys::RECOVERED_AT.to_string(), now.to_rfc3339());
    }
}

/// A record about to be inserted; the store assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTrackingRecord {
    pub version: String,
    pub status: MigrationStatus,
    pub branch: Option<String>,
    pub author: Option<String>,
    pub metadata: Metadata,
    pub created_at: Timestamp,
}

impl NewTrackingRecord {
    pub fn new(version: impl Into<String>, status: MigrationStatus, created_at: Timestamp) -> Self {
        Self {
            version: version.into(),
            status,
            branch: None,
            author: None,
            metadata: Metadata::new(),
            created_at,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Materialise with a store-assigned id. `updated_at` starts equal to
    /// `created_at`.
    pub fn into_record(self, id: RecordId) -> TrackingRecord {
        TrackingRecord {
            id,
            version: self.version,
            status: self.status,
            branch: self.branch,
            author: self.author,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}
