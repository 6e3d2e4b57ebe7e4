//! Nullable ledgers and script runner: thread-safe in-memory doubles.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use migtrack_store::{SchemaLedger, ScriptRunner, StoreError, TrackingStore};
use migtrack_types::{
    Direction, MigrationScript, MigrationStatus, NewTrackingRecord, RecordId, Timestamp,
    TrackingRecord,
};

fn offline() -> StoreError {
    StoreError::Backend("connection refused (nullable forced failure)".into())
}

/// An in-memory tracking ledger.
pub struct NullTrackingStore {
    records: Mutex<BTreeMap<RecordId, TrackingRecord>>,
    next_id: Mutex<u64>,
    failing: AtomicBool,
}

impl NullTrackingStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            next_id: Mutex::new(1),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every call fail as if the ledger were unreachable.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Insert a record whose `created_at` and `updated_at` are both `at`.
    pub fn seed(&self, version: &str, status: MigrationStatus, at: u64) -> TrackingRecord {
        self.seed_record(NewTrackingRecord::new(version, status, Timestamp::new(at)))
    }

    pub fn seed_record(&self, record: NewTrackingRecord) -> TrackingRecord {
        let mut next = self.next_id.lock().unwrap();
        let record = record.into_record(RecordId::new(*next));
        *next += 1;
        self.records
            .lock()
            .unwrap()
            .insert(record.id, record.clone());
        record
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(())
    }
}

impl Default for NullTrackingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingStore for NullTrackingStore {
    fn insert(&self, record: NewTrackingRecord) -> Result<TrackingRecord, StoreError> {
        self.check()?;
        Ok(self.seed_record(record))
    }

    fn update(&self, record: &TrackingRecord) -> Result<(), StoreError> {
        self.check()?;
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("tracking record {}", record.id))),
        }
    }

    fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.records.lock().unwrap().remove(&id).is_some())
    }

    fn get(&self, id: RecordId) -> Result<Option<TrackingRecord>, StoreError> {
        self.check()?;
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    fn all(&self) -> Result<Vec<TrackingRecord>, StoreError> {
        self.check()?;
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }
}

/// An in-memory schema ledger.
pub struct NullSchemaLedger {
    versions: Mutex<BTreeSet<String>>,
    failing: AtomicBool,
}

impl NullSchemaLedger {
    pub fn new() -> Self {
        Self {
            versions: Mutex::new(BTreeSet::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn with_versions<I, S>(versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ledger = Self::new();
        ledger
            .versions
            .lock()
            .unwrap()
            .extend(versions.into_iter().map(Into::into));
        ledger
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(())
    }
}

impl Default for NullSchemaLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaLedger for NullSchemaLedger {
    fn versions(&self) -> Result<BTreeSet<String>, StoreError> {
        self.check()?;
        Ok(self.versions.lock().unwrap().clone())
    }

    fn contains(&self, version: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.versions.lock().unwrap().contains(version))
    }

    fn insert(&self, version: &str) -> Result<(), StoreError> {
        self.check()?;
        self.versions.lock().unwrap().insert(version.to_string());
        Ok(())
    }

    fn delete(&self, version: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.versions.lock().unwrap().remove(version))
    }
}

/// A script runner that records what it was asked to run.
pub struct NullScriptRunner {
    runs: Mutex<Vec<(String, Direction)>>,
    fail_versions: Mutex<BTreeSet<String>>,
}

impl NullScriptRunner {
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(Vec::new()),
            fail_versions: Mutex::new(BTreeSet::new()),
        }
    }

    /// Make runs of `version` fail.
    pub fn fail_on(&self, version: &str) {
        self.fail_versions.lock().unwrap().insert(version.to_string());
    }

    /// Every `(version, direction)` run so far, including failed ones.
    pub fn runs(&self) -> Vec<(String, Direction)> {
        self.runs.lock().unwrap().clone()
    }
}

impl Default for NullScriptRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRunner for NullScriptRunner {
    fn run(&self, script: &MigrationScript, direction: Direction) -> Result<(), StoreError> {
        self.runs
            .lock()
            .unwrap()
            .push((script.version.clone(), direction));
        if self.fail_versions.lock().unwrap().contains(&script.version) {
            return Err(StoreError::Execution(format!(
                "{} ({direction}): forced failure",
                script.version
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn tracking_store_round_trip() {
        let store = NullTrackingStore::new();
        let mut record = store.seed("v1", MigrationStatus::Applied, 10);
        record.transition(MigrationStatus::RolledBack, Timestamp::new(20));
        store.update(&record).unwrap();
        assert_eq!(store.get(record.id).unwrap(), Some(record.clone()));
        assert!(store.delete(record.id).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn forced_failure_affects_every_call() {
        let store = NullTrackingStore::new();
        store.set_failing(true);
        assert!(store.all().is_err());
        assert!(store.versions().is_err());

        let ledger = NullSchemaLedger::with_versions(["v1"]);
        ledger.set_failing(true);
        assert!(ledger.contains("v1").is_err());
    }

    #[test]
    fn runner_records_and_fails_on_demand() {
        let runner = NullScriptRunner::new();
        runner.fail_on("2");
        let script = |v: &str| MigrationScript {
            version: v.into(),
            name: String::new(),
            path: PathBuf::from(format!("{v}.sql")),
            up: "x".into(),
            down: "y".into(),
        };
        assert!(runner.run(&script("1"), Direction::Up).is_ok());
        assert!(runner.run(&script("2"), Direction::Down).is_err());
        assert_eq!(
            runner.runs(),
            vec![("1".to_string(), Direction::Up), ("2".to_string(), Direction::Down)]
        );
    }
}
