//! Recovery action handlers.
//!
//! Every handler returns `Result`; [`dispatch`] is the only entry point and
//! turns the outcome into a logged boolean. Handlers re-read the records an
//! issue carries by id before touching either ledger, so a stale snapshot
//! cannot overwrite newer state and a vanished record stops the action early.

mod manual;
mod restore;
mod rollback;
mod schema;
mod tracking;

pub use manual::manual_sql;

use migtrack_types::{Issue, RecoveryAction, TrackingRecord};

use crate::{RecoveryContext, RecoveryError};

/// Run `action` against `issue`. Never panics on handler failure and never
/// returns an error: failures are logged and reported as `false`.
pub fn dispatch(action: RecoveryAction, issue: &Issue, ctx: &RecoveryContext<'_>) -> bool {
    use RecoveryAction::*;

    tracing::info!(version = %issue.version, issue = %issue.kind, %action, "running recovery action");
    let outcome = match action {
        CompleteRollback => rollback::complete_rollback(issue, ctx),
        RestoreMigration => restore::restore_migration(issue, ctx),
        MarkAsRolledBack => rollback::mark_as_rolled_back(issue, ctx),
        TrackMigration => tracking::track_migration(issue, ctx),
        RemoveFromSchema => schema::remove_from_schema(issue, ctx),
        ReapplyMigration => restore::reapply_migration(issue, ctx),
        RestoreFromGit => restore::restore_from_git(issue, ctx),
        MarkAsResolved => tracking::mark_as_resolved(issue, ctx),
        CreatePlaceholder => restore::create_placeholder(issue, ctx),
        ConsolidateRecords => tracking::consolidate_records(issue, ctx),
        RemoveDuplicates => tracking::remove_duplicates(issue, ctx).map(|removed| {
            tracing::info!(version = %issue.version, removed, "duplicate records removed");
        }),
        ManualIntervention => manual::manual_intervention(issue, ctx),
    };

    match outcome {
        Ok(()) => {
            tracing::info!(version = %issue.version, %action, "recovery action succeeded");
            true
        }
        Err(e) => {
            tracing::error!(version = %issue.version, %action, error = %e, "recovery action failed");
            false
        }
    }
}

/// Current state of the records attached to `issue`.
///
/// Issues without attached records resolve by version instead.
fn current_records(issue: &Issue, ctx: &RecoveryContext<'_>) -> Result<Vec<TrackingRecord>, RecoveryError> {
    if issue.migrations.is_empty() {
        return Ok(ctx.tracking.find_by_version(&issue.version)?);
    }
    issue
        .migrations
        .iter()
        .map(|snapshot| {
            ctx.tracking
                .get(snapshot.id)?
                .ok_or(RecoveryError::RecordVanished(snapshot.id))
        })
        .collect()
}

/// Apply `edit` to records already fetched with [`current_records`] and
/// persist them.
fn save_records(
    records: Vec<TrackingRecord>,
    ctx: &RecoveryContext<'_>,
    mut edit: impl FnMut(&mut TrackingRecord),
) -> Result<usize, RecoveryError> {
    let count = records.len();
    for mut record in records {
        edit(&mut record);
        ctx.tracking.update(&record)?;
    }
    Ok(count)
}

/// Apply `edit` to every current record of `issue` and persist it.
fn update_records(
    issue: &Issue,
    ctx: &RecoveryContext<'_>,
    edit: impl FnMut(&mut TrackingRecord),
) -> Result<usize, RecoveryError> {
    save_records(current_records(issue, ctx)?, ctx, edit)
}
