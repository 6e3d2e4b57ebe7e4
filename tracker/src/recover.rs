//! The `recover` command: analyze, then recover issue by issue.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use migtrack_recovery::{BackupManager, Operator, RecoveryAnalyzer, RecoveryExecutor};
use migtrack_types::{Issue, RecoveryAction};

use crate::TrackerContext;

/// What happened to each issue, as `kind version` strings.
#[derive(Debug, Default, Serialize)]
pub struct RecoverSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
}

impl RecoverSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Notes whether the wrapped operator declined to choose.
struct SkipAware<'o> {
    inner: &'o dyn Operator,
    skipped: AtomicBool,
}

impl Operator for SkipAware<'_> {
    fn choose(&self, issue: &Issue, choices: &[RecoveryAction]) -> Option<RecoveryAction> {
        let choice = self.inner.choose(issue, choices);
        self.skipped.store(choice.is_none(), Ordering::SeqCst);
        choice
    }

    fn show(&self, message: &str) {
        self.inner.show(message);
    }
}

fn label(issue: &Issue) -> String {
    format!("{} {}", issue.kind, issue.version)
}

/// Analyze and run one recovery per issue, most severe first.
///
/// With `action`, only issues that accept it are touched; the rest are
/// skipped.
pub fn recover(
    ctx: &TrackerContext<'_>,
    operator: &dyn Operator,
    backup: BackupManager,
    interactive: bool,
    action: Option<RecoveryAction>,
) -> RecoverSummary {
    let operator = SkipAware {
        inner: operator,
        skipped: AtomicBool::new(false),
    };
    let recovery = ctx.recovery(&operator);
    let mut issues = RecoveryAnalyzer::new(&recovery, ctx.config.stuck_rollback_timeout_secs).analyze();
    issues.sort_by_key(|i| i.severity);

    let mut summary = RecoverSummary::default();
    if issues.is_empty() {
        tracing::info!("no issues to recover");
        return summary;
    }

    let executor = RecoveryExecutor::new(recovery, backup, interactive);
    for issue in &issues {
        if action.is_some_and(|a| !issue.accepts(a)) {
            summary.skipped.push(label(issue));
            continue;
        }
        operator.skipped.store(false, Ordering::SeqCst);
        if executor.execute_recovery(issue, action) {
            summary.succeeded.push(label(issue));
        } else if operator.skipped.load(Ordering::SeqCst) {
            summary.skipped.push(label(issue));
        } else {
            summary.failed.push(label(issue));
        }
    }
    tracing::info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        skipped = summary.skipped.len(),
        "recovery finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use migtrack_database::DatabaseConfig;
    use migtrack_recovery::{LogOperator, ScriptedOperator};
    use migtrack_store::{SchemaLedger, TrackingStore};
    use migtrack_types::MigrationStatus;
    use std::time::Duration;

    fn no_backup() -> BackupManager {
        BackupManager::new(DatabaseConfig::memory(), "unused", Duration::from_secs(1))
    }

    #[test]
    fn non_interactive_recovers_everything_with_defaults() {
        let fx = Fixture::new(&[]);
        fx.schema.insert("5").unwrap();
        fx.tracking.seed("6", MigrationStatus::RollingBack, 0);
        fx.write_script("6");

        let summary = recover(&fx.ctx(), &LogOperator, no_backup(), false, None);
        assert_eq!(summary.succeeded, vec!["partial_rollback 6", "orphaned_schema 5"]);
        assert!(summary.is_clean());
        assert_eq!(fx.tracking.find_by_version("5").unwrap().len(), 1);
        assert_eq!(fx.tracking.find_by_version("6").unwrap()[0].status, MigrationStatus::RolledBack);
    }

    #[test]
    fn forced_action_skips_issues_that_do_not_accept_it() {
        let fx = Fixture::new(&[]);
        fx.schema.insert("5").unwrap();
        fx.tracking.seed("6", MigrationStatus::RollingBack, 0);
        fx.write_script("6");

        let summary = recover(
            &fx.ctx(),
            &LogOperator,
            no_backup(),
            false,
            Some(RecoveryAction::RemoveFromSchema),
        );
        assert_eq!(summary.succeeded, vec!["orphaned_schema 5"]);
        assert_eq!(summary.skipped, vec!["partial_rollback 6"]);
        assert!(!fx.schema.contains("5").unwrap());
    }

    #[test]
    fn operator_skip_and_failure_are_told_apart() {
        let fx = Fixture::new(&[]);
        fx.tracking.seed("4", MigrationStatus::Applied, 0);
        fx.schema.insert("9").unwrap();
        fx.write_script("9");

        // missing_file 4 (critical) is resolved, missing_from_schema 4 (high)
        // fails to reapply without a script, orphaned_schema 9 is skipped.
        let operator = ScriptedOperator::new([
            Some(RecoveryAction::MarkAsResolved),
            Some(RecoveryAction::ReapplyMigration),
            None,
        ]);
        let summary = recover(&fx.ctx(), &operator, no_backup(), true, None);
        assert_eq!(summary.succeeded, vec!["missing_file 4"]);
        assert_eq!(summary.failed, vec!["missing_from_schema 4"]);
        assert_eq!(summary.skipped, vec!["orphaned_schema 9"]);
        assert_eq!(operator.prompts(), 3);
        assert!(!summary.is_clean());
    }
}
