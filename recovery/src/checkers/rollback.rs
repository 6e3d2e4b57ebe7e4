use migtrack_store::TrackingStore;
use migtrack_types::{Clock, Issue, IssueKind, MigrationStatus};
use migtrack_utils::format_duration;

use super::IssueChecker;
use crate::RecoveryError;

/// Flags `rolling_back` records that have not moved for at least the
/// configured timeout.
pub struct RollbackChecker<'a> {
    tracking: &'a dyn TrackingStore,
    clock: &'a dyn Clock,
    timeout_secs: u64,
}

impl<'a> RollbackChecker<'a> {
    pub fn new(tracking: &'a dyn TrackingStore, clock: &'a dyn Clock, timeout_secs: u64) -> Self {
        Self {
            tracking,
            clock,
            timeout_secs,
        }
    }
}

impl IssueChecker for RollbackChecker<'_> {
    fn name(&self) -> &'static str {
        "rollback"
    }

    fn check(&self) -> Result<Vec<Issue>, RecoveryError> {
        let now = self.clock.now();
        let issues = self
            .tracking
            .with_status(MigrationStatus::RollingBack)?
            .into_iter()
            .filter(|record| record.updated_at.has_expired(self.timeout_secs, now))
            .map(|record| {
                let stuck_for = format_duration(record.updated_at.elapsed_since(now));
                let description = format!(
                    "Migration {} has been rolling back for {stuck_for} (limit {})",
                    record.version,
                    format_duration(self.timeout_secs),
                );
                Issue::new(IssueKind::PartialRollback, record.version.clone(), vec![record], description)
            })
            .collect();
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migtrack_nullables::{NullClock, NullTrackingStore};
    use migtrack_types::Severity;

    const TIMEOUT: u64 = 600;

    #[test]
    fn boundary_is_inclusive() {
        let tracking = NullTrackingStore::new();
        tracking.seed("1", MigrationStatus::RollingBack, 1_000);
        let clock = NullClock::new(1_000 + TIMEOUT);
        let issues = RollbackChecker::new(&tracking, &clock, TIMEOUT).check().unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::PartialRollback);
        assert_eq!(issues[0].severity, Severity::High);
        assert!(issues[0].description.contains("rolling back for 10m (limit 10m)"));
    }

    #[test]
    fn fresh_rollbacks_are_left_alone() {
        let tracking = NullTrackingStore::new();
        tracking.seed("1", MigrationStatus::RollingBack, 1_000);
        let clock = NullClock::new(1_000 + TIMEOUT - 1);
        assert!(RollbackChecker::new(&tracking, &clock, TIMEOUT).check().unwrap().is_empty());
    }

    #[test]
    fn other_statuses_are_ignored() {
        let tracking = NullTrackingStore::new();
        tracking.seed("1", MigrationStatus::Applied, 0);
        tracking.seed("2", MigrationStatus::RolledBack, 0);
        let clock = NullClock::new(100_000);
        assert!(RollbackChecker::new(&tracking, &clock, TIMEOUT).check().unwrap().is_empty());
    }
}
