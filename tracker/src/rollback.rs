//! Rolling back orphaned or specific migrations.

use serde::Serialize;

use migtrack_types::Direction;

use crate::{TrackedRunner, TrackerContext, TrackerError};

/// Outcome of [`rollback_orphaned`].
#[derive(Debug, Default, Serialize)]
pub struct RollbackSummary {
    pub rolled_back: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl RollbackSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

fn roll_back(ctx: &TrackerContext<'_>, runner: &TrackedRunner<'_>, version: &str) -> Result<(), TrackerError> {
    let script = ctx
        .scripts
        .load(version)?
        .ok_or_else(|| TrackerError::RollbackExecution {
            version: version.to_string(),
            reason: format!("no script in {}", ctx.scripts.dir().display()),
        })?;
    runner.run(&script, Direction::Down)
}

/// Roll back every orphaned migration, newest version first. Keeps going
/// past failures and reports them in the summary.
pub fn rollback_orphaned(ctx: &TrackerContext<'_>, runner: &TrackedRunner<'_>) -> Result<RollbackSummary, TrackerError> {
    let mut versions: Vec<String> = ctx
        .reporter()
        .orphaned()?
        .into_iter()
        .map(|r| r.version)
        .collect();
    versions.sort();
    versions.dedup();
    versions.reverse();

    let mut summary = RollbackSummary::default();
    if versions.is_empty() {
        tracing::info!("no orphaned migrations to roll back");
        return Ok(summary);
    }
    for version in versions {
        match roll_back(ctx, runner, &version) {
            Ok(()) => summary.rolled_back.push(version),
            Err(e) => {
                tracing::error!(%version, error = %e, "rollback failed");
                summary.failed.push((version, e.to_string()));
            }
        }
    }
    Ok(summary)
}

/// Roll back one tracked version.
pub fn rollback_specific(ctx: &TrackerContext<'_>, runner: &TrackedRunner<'_>, version: &str) -> Result<(), TrackerError> {
    if ctx.tracking.find_by_version(version)?.is_empty() {
        return Err(TrackerError::RecordNotFound(version.to_string()));
    }
    roll_back(ctx, runner, version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use crate::BatchSession;
    use migtrack_store::{SchemaLedger, TrackingStore};
    use migtrack_types::{MigrationStatus, Timestamp};

    #[test]
    fn orphans_roll_back_newest_first() {
        let fx = Fixture::new(&["1"]);
        for v in ["1", "2", "3"] {
            fx.applied_with_script(v);
        }
        let batch = BatchSession::start("main", Timestamp::new(50));
        let ctx = fx.ctx();
        let runner = ctx.tracked_runner(&batch);

        let summary = rollback_orphaned(&ctx, &runner).unwrap();
        assert_eq!(summary.rolled_back, vec!["3", "2"]);
        assert!(summary.is_clean());
        let ran: Vec<_> = fx.runner.runs().into_iter().map(|(v, _)| v).collect();
        assert_eq!(ran, vec!["3", "2"]);
        assert_eq!(fx.tracking.find_by_version("3").unwrap()[0].status, MigrationStatus::RolledBack);
        assert!(fx.schema.contains("1").unwrap());
        assert!(!fx.schema.contains("3").unwrap());
    }

    #[test]
    fn orphan_without_script_is_reported_not_fatal() {
        let fx = Fixture::new(&[]);
        fx.applied_with_script("2");
        fx.tracking.seed("5", MigrationStatus::Applied, 0);
        let batch = BatchSession::start("main", Timestamp::new(50));
        let ctx = fx.ctx();
        let runner = ctx.tracked_runner(&batch);

        let summary = rollback_orphaned(&ctx, &runner).unwrap();
        assert_eq!(summary.rolled_back, vec!["2"]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "5");
    }

    #[test]
    fn specific_rollback_of_untracked_version() {
        let fx = Fixture::new(&[]);
        let batch = BatchSession::start("main", Timestamp::new(50));
        let ctx = fx.ctx();
        let runner = ctx.tracked_runner(&batch);
        assert!(matches!(
            rollback_specific(&ctx, &runner, "404"),
            Err(TrackerError::RecordNotFound(v)) if v == "404"
        ));
    }

    #[test]
    fn specific_rollback_failure_leaves_rolling_back() {
        let fx = Fixture::new(&[]);
        fx.applied_with_script("7");
        fx.runner.fail_on("7");
        let batch = BatchSession::start("main", Timestamp::new(50));
        let ctx = fx.ctx();
        let runner = ctx.tracked_runner(&batch);

        assert!(matches!(
            rollback_specific(&ctx, &runner, "7"),
            Err(TrackerError::RollbackExecution { .. })
        ));
        assert_eq!(fx.tracking.find_by_version("7").unwrap()[0].status, MigrationStatus::RollingBack);
    }
}
