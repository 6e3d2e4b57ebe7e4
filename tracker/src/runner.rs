//! Runs migration scripts and keeps both ledgers informed.

use migtrack_database::MigrationScripts;
use migtrack_store::{SchemaLedger, ScriptRunner};
use migtrack_types::{Direction, MigrationScript};

use crate::{BatchSession, MigrationObserver, MigrationOutcome, TrackerError};

/// Wraps a [`ScriptRunner`]: observers hear about every run, and the schema
/// ledger is updated after the script succeeds.
pub struct TrackedRunner<'a> {
    runner: &'a dyn ScriptRunner,
    schema: &'a dyn SchemaLedger,
    batch: &'a BatchSession,
    observers: Vec<Box<dyn MigrationObserver + 'a>>,
}

impl<'a> TrackedRunner<'a> {
    pub fn new(runner: &'a dyn ScriptRunner, schema: &'a dyn SchemaLedger, batch: &'a BatchSession) -> Self {
        Self {
            runner,
            schema,
            batch,
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: impl MigrationObserver + 'a) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn run(&self, script: &MigrationScript, direction: Direction) -> Result<(), TrackerError> {
        for observer in &self.observers {
            observer.before_migrate(&script.version, direction)?;
        }

        let result = self.runner.run(script, direction).and_then(|()| match direction {
            Direction::Up => self.schema.insert(&script.version),
            Direction::Down => self.schema.delete(&script.version).map(|_| ()),
        });
        self.batch.record_run();

        let outcome = match &result {
            Ok(()) => MigrationOutcome::Succeeded,
            Err(e) => MigrationOutcome::Failed(e.to_string()),
        };
        for observer in &self.observers {
            if let Err(e) = observer.after_migrate(&script.version, direction, &outcome) {
                tracing::error!(version = %script.version, %direction, error = %e, "observer failed after migration");
            }
        }

        match result {
            Ok(()) => {
                tracing::info!(version = %script.version, %direction, "migration finished");
                Ok(())
            }
            Err(e) if direction == Direction::Down => Err(TrackerError::RollbackExecution {
                version: script.version.clone(),
                reason: e.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Versions on disk that the schema ledger has not recorded, in order.
    pub fn pending(&self, scripts: &MigrationScripts) -> Result<Vec<String>, TrackerError> {
        let applied = self.schema.versions()?;
        let mut pending: Vec<String> = scripts
            .list()?
            .into_iter()
            .map(|f| f.version)
            .filter(|v| !applied.contains(v))
            .collect();
        pending.dedup();
        Ok(pending)
    }

    /// Run every pending script forward, stopping at the first failure.
    pub fn migrate_pending(&self, scripts: &MigrationScripts) -> Result<Vec<String>, TrackerError> {
        let pending = self.pending(scripts)?;
        let mut ran = Vec::with_capacity(pending.len());
        for version in pending {
            let Some(script) = scripts.load(&version)? else {
                continue;
            };
            self.run(&script, Direction::Up)?;
            ran.push(version);
        }
        Ok(ran)
    }
}
