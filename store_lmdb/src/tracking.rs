//! LMDB implementation of TrackingStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use migtrack_store::{StoreError, TrackingStore};
use migtrack_types::{NewTrackingRecord, RecordId, TrackingRecord};

use crate::LmdbError;

const NEXT_ID_KEY: &[u8] = b"next_record_id";

pub struct LmdbTrackingStore {
    pub(crate) env: Arc<Env>,
    pub(crate) tracking_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

fn record_key(id: RecordId) -> [u8; 8] {
    id.as_u64().to_be_bytes()
}

pub(crate) fn decode_record(bytes: &[u8]) -> Result<TrackingRecord, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

impl TrackingStore for LmdbTrackingStore {
    fn insert(&self, record: NewTrackingRecord) -> Result<TrackingRecord, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let next = match self
            .meta_db
            .get(&wtxn, NEXT_ID_KEY)
            .map_err(LmdbError::from)?
        {
            Some(bytes) if bytes.len() == 8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(bytes);
                u64::from_be_bytes(buf)
            }
            Some(_) => {
                return Err(StoreError::Corruption(
                    "next_record_id has unexpected byte length".into(),
                ))
            }
            None => 1,
        };

        let record = record.into_record(RecordId::new(next));
        let bytes = bincode::serialize(&record).map_err(LmdbError::from)?;
        self.tracking_db
            .put(&mut wtxn, &record_key(record.id), &bytes)
            .map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, NEXT_ID_KEY, &(next + 1).to_be_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(record)
    }

    fn update(&self, record: &TrackingRecord) -> Result<(), StoreError> {
        let key = record_key(record.id);
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .tracking_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
            .is_none()
        {
            return Err(StoreError::NotFound(format!("tracking record {}", record.id)));
        }
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        self.tracking_db
            .put(&mut wtxn, &key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let existed = self
            .tracking_db
            .delete(&mut wtxn, &record_key(id))
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(existed)
    }

    fn get(&self, id: RecordId) -> Result<Option<TrackingRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .tracking_db
            .get(&rtxn, &record_key(id))
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode_record(bytes)?)),
            None => Ok(None),
        }
    }

    fn all(&self) -> Result<Vec<TrackingRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.tracking_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (_, val) = entry.map_err(LmdbError::from)?;
            results.push(decode_record(val)?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use migtrack_types::{MigrationStatus, Timestamp};

    fn open_test_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), LmdbEnvironment::DEFAULT_MAP_SIZE).unwrap();
        (dir, env)
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let (_dir, env) = open_test_env();
        let store = env.tracking_store();
        let a = store
            .insert(NewTrackingRecord::new("1", MigrationStatus::Applied, Timestamp::new(1)))
            .unwrap();
        let b = store
            .insert(NewTrackingRecord::new("2", MigrationStatus::Applied, Timestamp::new(2)))
            .unwrap();
        assert_eq!(a.id, RecordId::new(1));
        assert_eq!(b.id, RecordId::new(2));
        assert_eq!(store.all().unwrap(), vec![a, b]);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let (_dir, env) = open_test_env();
        let store = env.tracking_store();
        let a = store
            .insert(NewTrackingRecord::new("1", MigrationStatus::Applied, Timestamp::EPOCH))
            .unwrap();
        assert!(store.delete(a.id).unwrap());
        assert!(!store.delete(a.id).unwrap());
        let b = store
            .insert(NewTrackingRecord::new("1", MigrationStatus::Applied, Timestamp::EPOCH))
            .unwrap();
        assert_eq!(b.id, RecordId::new(2));
    }

    #[test]
    fn update_overwrites_and_rejects_unknown_ids() {
        let (_dir, env) = open_test_env();
        let store = env.tracking_store();
        let mut record = store
            .insert(
                NewTrackingRecord::new("20240101000001", MigrationStatus::Applied, Timestamp::new(5))
                    .with_branch("feature/x"),
            )
            .unwrap();
        record.transition(MigrationStatus::RollingBack, Timestamp::new(9));
        record.metadata.insert("k".into(), "v".into());
        store.update(&record).unwrap();
        assert_eq!(store.get(record.id).unwrap(), Some(record.clone()));

        record.id = RecordId::new(999);
        assert!(matches!(store.update(&record), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn duplicate_versions_are_stored_side_by_side() {
        let (_dir, env) = open_test_env();
        let store = env.tracking_store();
        for _ in 0..2 {
            store
                .insert(NewTrackingRecord::new("v9", MigrationStatus::Applied, Timestamp::EPOCH))
                .unwrap();
        }
        assert_eq!(store.find_by_version("v9").unwrap().len(), 2);
        assert_eq!(store.versions().unwrap().len(), 1);
    }

    #[test]
    fn records_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), LmdbEnvironment::DEFAULT_MAP_SIZE).unwrap();
            env.tracking_store()
                .insert(NewTrackingRecord::new("7", MigrationStatus::RolledBack, Timestamp::EPOCH))
                .unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), LmdbEnvironment::DEFAULT_MAP_SIZE).unwrap();
        let records = env.tracking_store().with_status(MigrationStatus::RolledBack).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].version, "7");
    }
}
