//! Borrowed collaborators shared by every tracker operation.

use migtrack_database::MigrationScripts;
use migtrack_reconcile::ReconciliationReporter;
use migtrack_recovery::{Operator, RecoveryContext};
use migtrack_store::{SchemaLedger, ScriptRunner, TrackingStore};
use migtrack_types::Clock;
use migtrack_vcs::VcsClient;

use crate::observer::TrackingObserver;
use crate::{BatchSession, TrackedRunner, TrackerConfig};

#[derive(Clone, Copy)]
pub struct TrackerContext<'a> {
    pub config: &'a TrackerConfig,
    pub tracking: &'a dyn TrackingStore,
    pub schema: &'a dyn SchemaLedger,
    pub runner: &'a dyn ScriptRunner,
    pub vcs: &'a dyn VcsClient,
    pub scripts: &'a MigrationScripts,
    pub clock: &'a dyn Clock,
}

impl<'a> TrackerContext<'a> {
    pub fn reporter(&self) -> ReconciliationReporter<'a> {
        ReconciliationReporter::new(self.tracking, self.vcs, self.config.targets())
    }

    pub fn recovery(&self, operator: &'a dyn Operator) -> RecoveryContext<'a> {
        RecoveryContext {
            tracking: self.tracking,
            schema: self.schema,
            runner: self.runner,
            vcs: self.vcs,
            scripts: self.scripts,
            clock: self.clock,
            operator,
        }
    }

    /// A runner that keeps the tracking ledger in step with `batch`.
    pub fn tracked_runner(&self, batch: &'a BatchSession) -> TrackedRunner<'a> {
        TrackedRunner::new(self.runner, self.schema, batch).with_observer(TrackingObserver::new(
            self.tracking,
            self.vcs,
            self.clock,
            &self.config.main_branch,
            batch,
        ))
    }
}
