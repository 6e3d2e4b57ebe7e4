use migtrack_types::script::{DOWN_MARKER, SCRIPT_EXTENSION, UP_MARKER};
use migtrack_types::{meta_keys, Direction, Issue, MigrationStatus, RecoveryAction};

use super::{current_records, save_records};
use crate::{RecoveryContext, RecoveryError};

/// Undo a half-finished rollback: the schema keeps the row, the record
/// goes back to applied.
pub(super) fn restore_migration(issue: &Issue, ctx: &RecoveryContext<'_>) -> Result<(), RecoveryError> {
    let records = current_records(issue, ctx)?;
    if !ctx.schema.contains(&issue.version)? {
        ctx.schema.insert(&issue.version)?;
    }
    let now = ctx.now();
    save_records(records, ctx, |record| {
        record.transition(MigrationStatus::Applied, now);
        record.stamp_recovery(RecoveryAction::RestoreMigration.as_str(), now);
    })?;
    Ok(())
}

/// Run the forward section again and re-record the version.
pub(super) fn reapply_migration(issue: &Issue, ctx: &RecoveryContext<'_>) -> Result<(), RecoveryError> {
    let records = current_records(issue, ctx)?;
    let script = ctx
        .scripts
        .load(&issue.version)?
        .ok_or_else(|| RecoveryError::ScriptNotFound(issue.version.clone()))?;
    ctx.runner.run(&script, Direction::Up)?;
    if !ctx.schema.contains(&issue.version)? {
        ctx.schema.insert(&issue.version)?;
    }
    let now = ctx.now();
    save_records(records, ctx, |record| {
        record.transition(MigrationStatus::Applied, now);
        record.stamp_recovery(RecoveryAction::ReapplyMigration.as_str(), now);
    })?;
    Ok(())
}

/// Bring a deleted script back from repository history.
pub(super) fn restore_from_git(issue: &Issue, ctx: &RecoveryContext<'_>) -> Result<(), RecoveryError> {
    let records = current_records(issue, ctx)?;
    let not_found = |detail: &str| RecoveryError::NotInHistory {
        version: issue.version.clone(),
        detail: detail.to_string(),
    };
    let path = ctx
        .vcs
        .find_script_in_history(&issue.version)?
        .ok_or_else(|| not_found("no script with this version was ever committed"))?;
    let commit = ctx
        .vcs
        .find_commit_touching(&path)?
        .ok_or_else(|| not_found(&format!("no commit still holds {path}")))?;
    let content = ctx
        .vcs
        .read_blob(&commit, &path)?
        .ok_or_else(|| not_found(&format!("{path} is not readable at {commit}")))?;

    let restored = ctx.scripts.write_script(&path, &content)?;
    tracing::info!(path = %restored.display(), %commit, "script restored from history");

    let now = ctx.now();
    save_records(records, ctx, |record| {
        record.stamp_recovery(RecoveryAction::RestoreFromGit.as_str(), now);
    })?;
    Ok(())
}

fn placeholder_body(version: &str) -> String {
    format!(
        "-- Placeholder for migration {version}. The original script was lost.\n\
         {UP_MARKER}\nSELECT 1;\n{DOWN_MARKER}\nSELECT 1;\n"
    )
}

/// Write a no-op script so the version has something on disk.
pub(super) fn create_placeholder(issue: &Issue, ctx: &RecoveryContext<'_>) -> Result<(), RecoveryError> {
    let records = current_records(issue, ctx)?;
    if ctx.scripts.exists(&issue.version)? {
        return Err(RecoveryError::Precondition(format!(
            "a script for {} already exists",
            issue.version
        )));
    }
    let file_name = format!("{}_placeholder.{SCRIPT_EXTENSION}", issue.version);
    let path = ctx
        .scripts
        .write_script(&file_name, placeholder_body(&issue.version).as_bytes())?;
    tracing::warn!(path = %path.display(), "placeholder script written; it does nothing");

    let now = ctx.now();
    let location = path.display().to_string();
    save_records(records, ctx, |record| {
        record.stamp_recovery(RecoveryAction::CreatePlaceholder.as_str(), now);
        record
            .metadata
            .insert(meta_keys::PLACEHOLDER_CREATED.to_string(), location.clone());
    })?;
    Ok(())
}
