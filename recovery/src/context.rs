//! The collaborators a recovery run works against.

use migtrack_database::MigrationScripts;
use migtrack_store::{SchemaLedger, ScriptRunner, TrackingStore};
use migtrack_types::{Clock, Timestamp};
use migtrack_vcs::VcsClient;

use crate::Operator;

/// Borrowed handles to every ledger and collaborator.
#[derive(Clone, Copy)]
pub struct RecoveryContext<'a> {
    pub tracking: &'a dyn TrackingStore,
    pub schema: &'a dyn SchemaLedger,
    pub runner: &'a dyn ScriptRunner,
    pub vcs: &'a dyn VcsClient,
    pub scripts: &'a MigrationScripts,
    pub clock: &'a dyn Clock,
    pub operator: &'a dyn Operator,
}

impl RecoveryContext<'_> {
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}
