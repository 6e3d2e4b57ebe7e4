//! The `meta` database: layout version and other ledger bookkeeping.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use migtrack_store::{MetaStore, StoreError};

use crate::LmdbError;

pub struct LmdbMetaStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl MetaStore for LmdbMetaStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let value = self.meta_db.get(&rtxn, key.as_bytes()).map_err(LmdbError::from)?;
        Ok(value.map(<[u8]>::to_vec))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    #[test]
    fn absent_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), LmdbEnvironment::DEFAULT_MAP_SIZE).unwrap();
        let meta = env.meta_store();
        assert_eq!(meta.get("last_operator").unwrap(), None);

        meta.put("last_operator", b"ada").unwrap();
        assert_eq!(meta.get("last_operator").unwrap().as_deref(), Some(&b"ada"[..]));
    }

    #[test]
    fn malformed_layout_version_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), LmdbEnvironment::DEFAULT_MAP_SIZE).unwrap();
        let meta = env.meta_store();
        meta.put("layout_version", b"\x01").unwrap();
        assert!(matches!(meta.layout_version(), Err(StoreError::Corruption(_))));
    }
}
