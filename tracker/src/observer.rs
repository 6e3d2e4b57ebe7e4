//! Hooks around each migration script run.

use migtrack_store::TrackingStore;
use migtrack_types::{Clock, Direction, MigrationStatus, NewTrackingRecord};
use migtrack_vcs::VcsClient;

use crate::{BatchSession, TrackerError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    Succeeded,
    Failed(String),
}

impl MigrationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Notified by [`TrackedRunner`](crate::TrackedRunner) around every script run.
pub trait MigrationObserver {
    /// An error aborts the run before the script executes.
    fn before_migrate(&self, version: &str, direction: Direction) -> Result<(), TrackerError>;

    fn after_migrate(
        &self,
        version: &str,
        direction: Direction,
        outcome: &MigrationOutcome,
    ) -> Result<(), TrackerError>;
}

/// Writes the tracking-ledger lifecycle for each run.
///
/// Forward success marks the version applied, creating the record with
/// branch and author when needed. A rollback first marks it rolling back,
/// then rolled back on success. Failures leave the in-progress state for
/// the rollback checker to find.
pub struct TrackingObserver<'a> {
    tracking: &'a dyn TrackingStore,
    vcs: &'a dyn VcsClient,
    clock: &'a dyn Clock,
    main_branch: &'a str,
    batch: &'a BatchSession,
}

impl<'a> TrackingObserver<'a> {
    pub fn new(
        tracking: &'a dyn TrackingStore,
        vcs: &'a dyn VcsClient,
        clock: &'a dyn Clock,
        main_branch: &'a str,
        batch: &'a BatchSession,
    ) -> Self {
        Self {
            tracking,
            vcs,
            clock,
            main_branch,
            batch,
        }
    }

    fn current_branch(&self) -> Option<String> {
        self.vcs
            .current_branch()
            .map_err(|e| tracing::warn!(error = %e, "could not read current branch"))
            .ok()
    }

    fn author(&self) -> Option<String> {
        self.vcs.user_name().ok().flatten()
    }

    /// Move every record of `version` to `status`; false if there were none.
    fn transition_all(&self, version: &str, status: MigrationStatus) -> Result<bool, TrackerError> {
        let records = self.tracking.find_by_version(version)?;
        let now = self.clock.now();
        for mut record in records.iter().cloned() {
            record.transition(status, now);
            self.tracking.update(&record)?;
        }
        Ok(!records.is_empty())
    }

    fn create(&self, version: &str, status: MigrationStatus, branch: Option<String>) -> Result<(), TrackerError> {
        let mut record = NewTrackingRecord::new(version, status, self.clock.now()).with_author(self.author());
        record.branch = branch;
        let record = self.tracking.insert(record)?;
        tracing::debug!(id = %record.id, %version, %status, "tracking record created");
        Ok(())
    }

    fn check_trunk(&self, version: &str, branch: Option<&str>) {
        if branch == Some(self.main_branch) {
            return;
        }
        match self.vcs.migration_versions_in_branch(self.main_branch) {
            Ok(trunk) if trunk.iter().any(|v| v == version) => {}
            Ok(_) => self.batch.defer_not_in_trunk(version, branch),
            Err(e) => tracing::warn!(error = %e, branch = self.main_branch, "could not list trunk migrations"),
        }
    }
}

impl MigrationObserver for TrackingObserver<'_> {
    fn before_migrate(&self, version: &str, direction: Direction) -> Result<(), TrackerError> {
        if direction == Direction::Down {
            self.transition_all(version, MigrationStatus::RollingBack)?;
        }
        Ok(())
    }

    fn after_migrate(
        &self,
        version: &str,
        direction: Direction,
        outcome: &MigrationOutcome,
    ) -> Result<(), TrackerError> {
        if let MigrationOutcome::Failed(reason) = outcome {
            tracing::error!(%version, %direction, %reason, "migration failed, tracking state left as is");
            return Ok(());
        }
        match direction {
            Direction::Up => {
                let branch = self.current_branch();
                if !self.transition_all(version, MigrationStatus::Applied)? {
                    self.create(version, MigrationStatus::Applied, branch.clone())?;
                }
                self.check_trunk(version, branch.as_deref());
            }
            Direction::Down => {
                if !self.transition_all(version, MigrationStatus::RolledBack)? {
                    self.create(version, MigrationStatus::RolledBack, self.current_branch())?;
                }
            }
        }
        Ok(())
    }
}
