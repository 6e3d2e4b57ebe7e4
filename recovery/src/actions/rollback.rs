use migtrack_types::{meta_keys, Issue, MigrationStatus, RecoveryAction};

use super::{current_records, save_records, update_records};
use crate::{RecoveryContext, RecoveryError};

const UNVERIFIED_WARNING: &str = "Marked as rolled back without verifying database state";

/// Finish a rollback: drop the schema row and mark the record rolled back.
pub(super) fn complete_rollback(issue: &Issue, ctx: &RecoveryContext<'_>) -> Result<(), RecoveryError> {
    let records = current_records(issue, ctx)?;
    if ctx.schema.delete(&issue.version)? {
        tracing::debug!(version = %issue.version, "removed from schema_migrations");
    }
    let now = ctx.now();
    save_records(records, ctx, |record| {
        record.transition(MigrationStatus::RolledBack, now);
        record.stamp_recovery(RecoveryAction::CompleteRollback.as_str(), now);
    })?;
    Ok(())
}

/// Mark rolled back without touching the schema ledger.
pub(super) fn mark_as_rolled_back(issue: &Issue, ctx: &RecoveryContext<'_>) -> Result<(), RecoveryError> {
    let now = ctx.now();
    let updated = update_records(issue, ctx, |record| {
        record.transition(MigrationStatus::RolledBack, now);
        record.stamp_recovery(RecoveryAction::MarkAsRolledBack.as_str(), now);
        record
            .metadata
            .insert(meta_keys::WARNING.to_string(), UNVERIFIED_WARNING.to_string());
    })?;
    if updated == 0 {
        return Err(RecoveryError::Precondition(format!(
            "no tracking record for {}",
            issue.version
        )));
    }
    tracing::warn!(version = %issue.version, "status changed without verifying the database");
    Ok(())
}
