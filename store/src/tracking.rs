//! Tracking ledger storage trait.

use std::collections::BTreeSet;

use migtrack_types::{MigrationStatus, NewTrackingRecord, RecordId, TrackingRecord};

use crate::StoreError;

/// The persisted record of every migration run locally.
///
/// Records are addressed by [`RecordId`]; versions are expected to be unique
/// but the store does not enforce it, so duplicates can be detected and
/// repaired.
pub trait TrackingStore: Send + Sync {
    /// Insert a record and return it with its assigned id.
    fn insert(&self, record: NewTrackingRecord) -> Result<TrackingRecord, StoreError>;

    /// Overwrite an existing record (matched by id).
    ///
    /// Returns `StoreError::NotFound` if no record has that id.
    fn update(&self, record: &TrackingRecord) -> Result<(), StoreError>;

    /// Delete a record. Returns `false` if it did not exist.
    fn delete(&self, id: RecordId) -> Result<bool, StoreError>;

    /// Fetch a record by id.
    fn get(&self, id: RecordId) -> Result<Option<TrackingRecord>, StoreError>;

    /// All records, ordered by id.
    fn all(&self) -> Result<Vec<TrackingRecord>, StoreError>;

    /// All records for a version, ordered by id.
    fn find_by_version(&self, version: &str) -> Result<Vec<TrackingRecord>, StoreError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|r| r.version == version)
            .collect())
    }

    /// All records with the given status, ordered by id.
    fn with_status(&self, status: MigrationStatus) -> Result<Vec<TrackingRecord>, StoreError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|r| r.status == status)
            .collect())
    }

    /// The distinct set of tracked versions, in any status.
    fn versions(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.all()?.into_iter().map(|r| r.version).collect())
    }
}
