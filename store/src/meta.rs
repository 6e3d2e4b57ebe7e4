//! Ledger bookkeeping outside the records themselves.

use crate::StoreError;

const LAYOUT_VERSION_KEY: &str = "layout_version";

/// Small key-value area a backend keeps beside its records.
pub trait MetaStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// On-disk layout version; 0 for a ledger that never stored one.
    fn layout_version(&self) -> Result<u32, StoreError> {
        match self.get(LAYOUT_VERSION_KEY)? {
            None => Ok(0),
            Some(bytes) => bytes
                .try_into()
                .map(u32::from_le_bytes)
                .map_err(|_| StoreError::Corruption("layout_version is not 4 bytes".into())),
        }
    }

    fn set_layout_version(&self, version: u32) -> Result<(), StoreError> {
        self.put(LAYOUT_VERSION_KEY, &version.to_le_bytes())
    }
}
