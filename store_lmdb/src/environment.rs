//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::meta::LmdbMetaStore;
use crate::migration::Migrator;
use crate::tracking::LmdbTrackingStore;
use crate::LmdbError;

/// Named databases inside the environment.
pub(crate) const TRACKING_DB: &str = "tracking";
pub(crate) const META_DB: &str = "meta";

const MAX_DBS: u32 = 4;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    path: PathBuf,
    pub(crate) tracking_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Default map size: the tracking ledger is small, 64 MiB is plenty.
    pub const DEFAULT_MAP_SIZE: usize = 64 * 1024 * 1024;

    /// Open or create an LMDB environment at the given path and bring its
    /// layout up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process per path; the
        // caller owns the directory for the lifetime of the returned value.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let tracking_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some(TRACKING_DB))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
            tracking_db,
            meta_db,
        };

        Migrator::run(&environment.meta_store())?;
        tracing::debug!(path = %path.display(), "tracking ledger opened");
        Ok(environment)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn tracking_store(&self) -> LmdbTrackingStore {
        LmdbTrackingStore {
            env: Arc::clone(&self.env),
            tracking_db: self.tracking_db,
            meta_db: self.meta_db,
        }
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migtrack_store::MetaStore;

    #[test]
    fn open_creates_directory_and_stamps_layout_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger");
        let env = LmdbEnvironment::open(&path, LmdbEnvironment::DEFAULT_MAP_SIZE).unwrap();
        assert!(path.join("data.mdb").exists());
        assert_eq!(
            env.meta_store().layout_version().unwrap(),
            crate::migration::CURRENT_LAYOUT_VERSION
        );
    }
}
