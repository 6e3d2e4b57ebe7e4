//! Guarded execution of recovery actions.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use migtrack_types::{Issue, RecoveryAction};

use crate::{actions, BackupManager, RecoveryContext};

/// Clears the in-flight flag however the call exits.
struct ExecutionGuard<'a>(&'a AtomicBool);

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Resolves an action for an issue and runs it.
///
/// One call at a time: a call that arrives while another is in flight
/// returns `false` without touching anything. This is an in-process guard
/// only; two processes can still race on the same ledgers.
pub struct RecoveryExecutor<'a> {
    ctx: RecoveryContext<'a>,
    interactive: bool,
    backup: Mutex<BackupManager>,
    executing: AtomicBool,
}

impl<'a> RecoveryExecutor<'a> {
    pub fn new(ctx: RecoveryContext<'a>, backup: BackupManager, interactive: bool) -> Self {
        Self {
            ctx,
            interactive,
            backup: Mutex::new(backup),
            executing: AtomicBool::new(false),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::SeqCst)
    }

    /// Where this session's backup went, if one was written.
    pub fn backup_path(&self) -> Option<PathBuf> {
        let backup = self.backup.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        backup
            .has_backup()
            .then(|| backup.backup_path().map(PathBuf::from))
            .flatten()
    }

    /// Run one recovery action for `issue`.
    ///
    /// `option` wins when given. Otherwise an interactive executor asks the
    /// operator and a non-interactive one takes the issue's first option.
    /// Returns `false` when skipped, refused, or the action failed.
    pub fn execute_recovery(&self, issue: &Issue, option: Option<RecoveryAction>) -> bool {
        if self
            .executing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(version = %issue.version, "recovery already in progress, refusing to nest");
            return false;
        }
        let _guard = ExecutionGuard(&self.executing);

        self.ensure_backup();

        let Some(action) = self.resolve_action(issue, option) else {
            tracing::info!(version = %issue.version, issue = %issue.kind, "skipped by operator");
            return false;
        };
        if !issue.accepts(action) {
            tracing::error!(version = %issue.version, issue = %issue.kind, %action, "unknown option for this issue");
            return false;
        }
        actions::dispatch(action, issue, &self.ctx)
    }

    fn ensure_backup(&self) {
        let mut backup = self.backup.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if backup.attempted() {
            return;
        }
        match backup.create_backup(self.ctx.clock) {
            Ok(true) => {
                if let Some(path) = backup.backup_path() {
                    self.ctx.operator.show(&format!("Database backup written to {}", path.display()));
                }
            }
            Ok(false) => {
                self.ctx
                    .operator
                    .show("WARNING: no database backup was created; continuing without one");
            }
            Err(e) => {
                tracing::error!(error = %e, "backup failed, continuing without one");
                self.ctx
                    .operator
                    .show(&format!("WARNING: database backup failed ({e}); continuing without one"));
            }
        }
    }

    fn resolve_action(&self, issue: &Issue, option: Option<RecoveryAction>) -> Option<RecoveryAction> {
        if option.is_some() {
            return option;
        }
        if self.interactive {
            let mut choices = issue.recovery_options.clone();
            choices.push(RecoveryAction::ManualIntervention);
            return self.ctx.operator.choose(issue, &choices);
        }
        issue.recovery_options.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    use crate::actions::fixture::Fixture;
    use crate::{Operator, ScriptedOperator};
    use migtrack_database::{DatabaseConfig, MigrationScripts};
    use migtrack_nullables::{NullClock, NullSchemaLedger, NullTrackingStore, NullVcs};
    use migtrack_store::{ScriptRunner, SchemaLedger, StoreError, TrackingStore};
    use migtrack_types::{Direction, IssueKind, MigrationScript, MigrationStatus};

    fn no_backup() -> BackupManager {
        BackupManager::new(DatabaseConfig::memory(), "unused", Duration::from_secs(1))
    }

    fn partial_rollback(fx: &Fixture) -> Issue {
        let record = fx.tracking.seed("5", MigrationStatus::RollingBack, 0);
        fx.schema.insert("5").unwrap();
        Issue::new(IssueKind::PartialRollback, "5", vec![record], "")
    }

    #[test]
    fn non_interactive_takes_first_option() {
        let fx = Fixture::new();
        let issue = partial_rollback(&fx);
        let executor = RecoveryExecutor::new(fx.ctx(), no_backup(), false);
        assert!(executor.execute_recovery(&issue, None));
        assert!(!fx.schema.contains("5").unwrap());
        assert_eq!(fx.operator.prompts(), 0);
        assert!(!executor.is_executing());
    }

    #[test]
    fn explicit_option_wins_over_prompt() {
        let fx = Fixture::new();
        let issue = partial_rollback(&fx);
        let executor = RecoveryExecutor::new(fx.ctx(), no_backup(), true);
        assert!(executor.execute_recovery(&issue, Some(RecoveryAction::RestoreMigration)));
        assert_eq!(fx.operator.prompts(), 0);
        assert!(fx.schema.contains("5").unwrap());
    }

    #[test]
    fn interactive_skip_returns_false() {
        let fx = Fixture::new();
        let issue = partial_rollback(&fx);
        let executor = RecoveryExecutor::new(fx.ctx(), no_backup(), true);
        assert!(!executor.execute_recovery(&issue, None));
        assert_eq!(fx.operator.prompts(), 1);
        assert!(fx.schema.contains("5").unwrap());
    }

    #[test]
    fn interactive_choice_is_dispatched() {
        let mut fx = Fixture::new();
        fx.operator = ScriptedOperator::new([Some(RecoveryAction::MarkAsRolledBack)]);
        let issue = partial_rollback(&fx);
        let executor = RecoveryExecutor::new(fx.ctx(), no_backup(), true);
        assert!(executor.execute_recovery(&issue, None));
        let record = &fx.tracking.find_by_version("5").unwrap()[0];
        assert_eq!(record.status, MigrationStatus::RolledBack);
        assert!(fx.schema.contains("5").unwrap());
    }

    #[test]
    fn option_foreign_to_the_issue_is_refused() {
        let fx = Fixture::new();
        let issue = partial_rollback(&fx);
        let executor = RecoveryExecutor::new(fx.ctx(), no_backup(), false);
        assert!(!executor.execute_recovery(&issue, Some(RecoveryAction::ConsolidateRecords)));
        assert_eq!(fx.tracking.find_by_version("5").unwrap()[0].status, MigrationStatus::RollingBack);
    }

    #[test]
    fn backup_is_taken_once_before_first_action() {
        let fx = Fixture::new();
        let db = fx.dir.path().join("app.sqlite3");
        std::fs::write(&db, b"data").unwrap();
        let backups = fx.dir.path().join("backups");
        let manager = BackupManager::new(
            DatabaseConfig::sqlite(db.to_string_lossy()),
            &backups,
            Duration::from_secs(5),
        );
        let issue = partial_rollback(&fx);
        let executor = RecoveryExecutor::new(fx.ctx(), manager, false);

        assert!(executor.execute_recovery(&issue, Some(RecoveryAction::ManualIntervention)));
        assert!(executor.execute_recovery(&issue, None));
        assert!(executor.backup_path().is_some());
        assert_eq!(std::fs::read_dir(&backups).unwrap().count(), 1);
        assert!(fx.operator.shown()[0].starts_with("Database backup written to"));
    }

    #[test]
    fn failed_backup_does_not_block_recovery() {
        let fx = Fixture::new();
        let manager = BackupManager::new(
            DatabaseConfig::sqlite(fx.dir.path().join("missing.sqlite3").to_string_lossy()),
            fx.dir.path().join("backups"),
            Duration::from_secs(5),
        );
        let issue = partial_rollback(&fx);
        let executor = RecoveryExecutor::new(fx.ctx(), manager, false);
        assert!(executor.execute_recovery(&issue, None));
        assert!(executor.backup_path().is_none());
        assert!(fx.operator.shown()[0].starts_with("WARNING: database backup failed"));
    }

    /// A runner that parks inside `run` until released.
    struct ParkedRunner {
        entered: Mutex<Option<mpsc::Sender<()>>>,
        release: Mutex<mpsc::Receiver<()>>,
        runs: Mutex<usize>,
    }

    impl ScriptRunner for ParkedRunner {
        fn run(&self, _script: &MigrationScript, _direction: Direction) -> Result<(), StoreError> {
            *self.runs.lock().unwrap() += 1;
            if let Some(entered) = self.entered.lock().unwrap().take() {
                entered.send(()).unwrap();
            }
            self.release.lock().unwrap().recv().unwrap();
            Ok(())
        }
    }

    #[test]
    fn second_call_while_first_is_in_flight_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = MigrationScripts::new(dir.path());
        scripts
            .write_script("4_add_users.sql", b"-- migrate:up\nCREATE TABLE users (id INTEGER);\n")
            .unwrap();
        let tracking = NullTrackingStore::new();
        let record = tracking.seed("4", MigrationStatus::Applied, 0);
        let schema = NullSchemaLedger::new();
        let vcs = NullVcs::new("main");
        let clock = NullClock::new(0);
        let operator = ScriptedOperator::default();

        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let runner = ParkedRunner {
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(release_rx),
            runs: Mutex::new(0),
        };
        let ctx = RecoveryContext {
            tracking: &tracking,
            schema: &schema,
            runner: &runner,
            vcs: &vcs,
            scripts: &scripts,
            clock: &clock,
            operator: &operator as &dyn Operator,
        };
        let executor = RecoveryExecutor::new(ctx, no_backup(), false);
        let issue = Issue::new(IssueKind::MissingFromSchema, "4", vec![record], "");

        std::thread::scope(|s| {
            let first = s.spawn(|| executor.execute_recovery(&issue, None));
            entered_rx.recv().unwrap();
            assert!(executor.is_executing());
            assert!(!executor.execute_recovery(&issue, None));
            release_tx.send(()).unwrap();
            assert!(first.join().unwrap());
        });

        assert_eq!(*runner.runs.lock().unwrap(), 1);
        assert!(!executor.is_executing());
        assert!(schema.contains("4").unwrap());
    }
}
