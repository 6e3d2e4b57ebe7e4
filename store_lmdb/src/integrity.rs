//! Tracking-ledger integrity checks.
//!
//! Run by `doctor` to detect corruption before any recovery is attempted.

use std::path::Path;
use std::sync::Arc;

use heed::Env;

use crate::environment::{META_DB, TRACKING_DB};
use crate::tracking::decode_record;
use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

const EXPECTED_DATABASES: &[&str] = &[TRACKING_DB, META_DB];

/// Check tracking-ledger integrity.
///
/// Opens each expected database and counts entries; every tracking record
/// is decoded and its key compared with the id it carries. Read failures
/// are recorded in the report rather than causing a hard error.
pub fn check_integrity(env: &Arc<Env>) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let rtxn = env.read_txn()?;

    for &db_name in EXPECTED_DATABASES {
        match env.open_database::<heed::types::Bytes, heed::types::Bytes>(&rtxn, Some(db_name)) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{}': {}", db_name, e)),
                }
                if db_name == TRACKING_DB {
                    check_records(&db, &rtxn, &mut report);
                }
            }
            Ok(None) => report
                .errors
                .push(format!("database '{}' is missing", db_name)),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{}': {}", db_name, e)),
        }
    }

    Ok(report)
}

fn check_records(
    db: &heed::Database<heed::types::Bytes, heed::types::Bytes>,
    rtxn: &heed::RoTxn,
    report: &mut IntegrityReport,
) {
    let iter = match db.iter(rtxn) {
        Ok(iter) => iter,
        Err(e) => {
            report.errors.push(format!("failed to iterate records: {}", e));
            return;
        }
    };
    for entry in iter {
        let (key, val) = match entry {
            Ok(kv) => kv,
            Err(e) => {
                report.errors.push(format!("failed to read record: {}", e));
                continue;
            }
        };
        match decode_record(val) {
            Ok(record) if key == record.id.as_u64().to_be_bytes() => {}
            Ok(record) => report
                .errors
                .push(format!("record {} is stored under a mismatched key", record.id)),
            Err(e) => report
                .errors
                .push(format!("undecodable record under key {:?}: {}", key, e)),
        }
    }
}

/// Check if the ledger directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "tracking ledger directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use migtrack_store::TrackingStore;
    use migtrack_types::{MigrationStatus, NewTrackingRecord, Timestamp};

    #[test]
    fn check_data_dir_fresh_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(&dir.path().join("nope")).is_ok());
    }

    #[test]
    fn check_data_dir_without_data_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(dir.path()).is_err());
    }

    #[test]
    fn healthy_ledger_reports_entries() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), LmdbEnvironment::DEFAULT_MAP_SIZE).unwrap();
        env.tracking_store()
            .insert(NewTrackingRecord::new("1", MigrationStatus::Applied, Timestamp::EPOCH))
            .unwrap();

        let report = check_integrity(env.env()).unwrap();
        assert!(report.is_healthy(), "{:?}", report.errors);
        assert_eq!(report.databases_checked, 2);
        // one record, plus layout version and id counter in meta
        assert_eq!(report.total_entries, 3);
    }

    #[test]
    fn garbage_record_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), LmdbEnvironment::DEFAULT_MAP_SIZE).unwrap();
        let mut wtxn = env.env().write_txn().unwrap();
        env.tracking_db
            .put(&mut wtxn, &7u64.to_be_bytes(), b"\xff\xff")
            .unwrap();
        wtxn.commit().unwrap();

        let report = check_integrity(env.env()).unwrap();
        assert!(!report.is_healthy());
    }
}
