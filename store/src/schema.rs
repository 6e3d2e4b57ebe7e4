//! Schema ledger trait.

use std::collections::BTreeSet;

use crate::StoreError;

/// The database engine's own table of applied migration versions.
///
/// Implementations must compare versions by exact string equality and pass
/// them as bound parameters, never interpolated into SQL.
pub trait SchemaLedger: Send + Sync {
    /// Every version the engine considers applied.
    fn versions(&self) -> Result<BTreeSet<String>, StoreError>;

    fn contains(&self, version: &str) -> Result<bool, StoreError>;

    /// Insert a version. Inserting a version that is already present is a
    /// no-op.
    fn insert(&self, version: &str) -> Result<(), StoreError>;

    /// Delete a version. Returns `false` if it was not present.
    fn delete(&self, version: &str) -> Result<bool, StoreError>;
}
