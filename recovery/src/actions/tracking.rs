use serde::Serialize;

use migtrack_types::{
    meta_keys, Issue, Metadata, MigrationStatus, NewTrackingRecord, RecordId, RecoveryAction,
    TrackingRecord,
};

use super::update_records;
use crate::{RecoveryContext, RecoveryError};

const UNKNOWN_BRANCH: &str = "unknown";

/// Start tracking a version that only the schema ledger knows about.
pub(super) fn track_migration(issue: &Issue, ctx: &RecoveryContext<'_>) -> Result<(), RecoveryError> {
    if !ctx.tracking.find_by_version(&issue.version)?.is_empty() {
        tracing::info!(version = %issue.version, "already tracked, nothing to insert");
        return Ok(());
    }

    let branch = ctx.vcs.current_branch().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read current branch");
        UNKNOWN_BRANCH.to_string()
    });
    let author = ctx.vcs.user_name().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read git user");
        None
    });

    let now = ctx.now();
    let record = ctx.tracking.insert(
        NewTrackingRecord::new(issue.version.clone(), MigrationStatus::Applied, now)
            .with_branch(branch)
            .with_author(author)
            .with_meta(meta_keys::RECOVERY_ACTION, RecoveryAction::TrackMigration.as_str())
            .with_meta(meta_keys::RECOVERED_AT, now.to_rfc3339())
            .with_meta(meta_keys::SOURCE, "schema_migrations"),
    )?;
    tracing::debug!(id = %record.id, "tracking record created");
    Ok(())
}

/// Accept the current state as final.
pub(super) fn mark_as_resolved(issue: &Issue, ctx: &RecoveryContext<'_>) -> Result<(), RecoveryError> {
    let now = ctx.now();
    update_records(issue, ctx, |record| {
        record.transition(MigrationStatus::Resolved, now);
        record.stamp_recovery(RecoveryAction::MarkAsResolved.as_str(), now);
    })?;
    Ok(())
}

#[derive(Serialize)]
struct MergedFrom<'a> {
    id: u64,
    branch: Option<&'a str>,
}

/// Newest record by `updated_at`, ties broken by the larger id.
fn newest<'r>(records: impl Iterator<Item = &'r TrackingRecord>) -> Option<&'r TrackingRecord> {
    records.max_by_key(|r| (r.updated_at, r.id))
}

fn delete_all_but(keeper: RecordId, records: &[TrackingRecord], ctx: &RecoveryContext<'_>) -> Result<usize, RecoveryError> {
    let mut removed = 0;
    for record in records.iter().filter(|r| r.id != keeper) {
        if ctx.tracking.delete(record.id)? {
            removed += 1;
        }
    }
    Ok(removed)
}

/// Merge every record of a conflicting version into the newest one.
pub(super) fn consolidate_records(issue: &Issue, ctx: &RecoveryContext<'_>) -> Result<(), RecoveryError> {
    let mut records = ctx.tracking.find_by_version(&issue.version)?;
    if records.len() < 2 {
        tracing::info!(version = %issue.version, "no duplicates left to consolidate");
        return Ok(());
    }
    records.sort_by_key(|r| (r.updated_at, r.id));
    let Some(mut keeper) = records.last().cloned() else {
        return Ok(());
    };

    // Oldest first, so newer values win on key collisions.
    let mut merged = Metadata::new();
    for record in &records {
        merged.extend(record.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    let sources: Vec<MergedFrom<'_>> = records
        .iter()
        .filter(|r| r.id != keeper.id)
        .map(|r| MergedFrom {
            id: r.id.as_u64(),
            branch: r.branch.as_deref(),
        })
        .collect();

    let now = ctx.now();
    merged.insert(meta_keys::CONSOLIDATED_AT.to_string(), now.to_rfc3339());
    merged.insert(meta_keys::CONSOLIDATED_FROM.to_string(), serde_json::to_string(&sources)?);
    merged.insert(meta_keys::CONSOLIDATED_FROM_COUNT.to_string(), records.len().to_string());
    keeper.metadata = merged;
    keeper.updated_at = now;
    keeper.stamp_recovery(RecoveryAction::ConsolidateRecords.as_str(), now);

    ctx.tracking.update(&keeper)?;
    let removed = delete_all_but(keeper.id, &records, ctx)?;
    tracing::info!(version = %issue.version, keeper = %keeper.id, removed, "records consolidated");
    Ok(())
}

/// Keep one record for the version, preferring an applied one. Returns how
/// many were deleted.
pub(super) fn remove_duplicates(issue: &Issue, ctx: &RecoveryContext<'_>) -> Result<usize, RecoveryError> {
    let records = ctx.tracking.find_by_version(&issue.version)?;
    if records.len() < 2 {
        return Ok(0);
    }
    let keeper = newest(records.iter().filter(|r| r.status == MigrationStatus::Applied))
        .or_else(|| newest(records.iter()))
        .cloned()
        .ok_or_else(|| RecoveryError::Precondition(format!("no records for {}", issue.version)))?;

    let removed = delete_all_but(keeper.id, &records, ctx)?;
    let mut keeper = keeper;
    let now = ctx.now();
    keeper.stamp_recovery(RecoveryAction::RemoveDuplicates.as_str(), now);
    ctx.tracking.update(&keeper)?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::dispatch;
    use crate::actions::fixture::Fixture;
    use migtrack_store::TrackingStore;
    use migtrack_types::{IssueKind, Timestamp};

    fn conflict(fx: &Fixture, version: &str) -> Issue {
        let records = fx.tracking.find_by_version(version).unwrap();
        Issue::new(IssueKind::VersionConflict, version, records, "")
    }

    #[test]
    fn track_migration_uses_vcs_details() {
        let fx = Fixture::new();
        let issue = Issue::new(IssueKind::OrphanedSchema, "v2", Vec::new(), "");
        assert!(dispatch(RecoveryAction::TrackMigration, &issue, &fx.ctx()));

        let records = fx.tracking.find_by_version("v2").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, MigrationStatus::Applied);
        assert_eq!(records[0].branch.as_deref(), Some("main"));
        assert_eq!(records[0].author.as_deref(), Some("Ada"));
        assert_eq!(records[0].metadata[meta_keys::SOURCE], "schema_migrations");

        assert!(dispatch(RecoveryAction::TrackMigration, &issue, &fx.ctx()));
        assert_eq!(fx.tracking.len(), 1);
    }

    #[test]
    fn track_migration_falls_back_when_vcs_is_down() {
        let fx = Fixture::new();
        fx.vcs.set_failing(true);
        let issue = Issue::new(IssueKind::OrphanedSchema, "v2", Vec::new(), "");
        assert!(dispatch(RecoveryAction::TrackMigration, &issue, &fx.ctx()));
        let record = &fx.tracking.find_by_version("v2").unwrap()[0];
        assert_eq!(record.branch.as_deref(), Some(UNKNOWN_BRANCH));
        assert_eq!(record.author, None);
    }

    #[test]
    fn mark_as_resolved_sets_status() {
        let fx = Fixture::new();
        let record = fx.tracking.seed("7", MigrationStatus::Applied, 0);
        let issue = Issue::new(IssueKind::MissingFile, "7", vec![record.clone()], "");
        assert!(dispatch(RecoveryAction::MarkAsResolved, &issue, &fx.ctx()));
        assert_eq!(fx.tracking.get(record.id).unwrap().unwrap().status, MigrationStatus::Resolved);
    }

    #[test]
    fn consolidate_merges_metadata_into_newest() {
        let fx = Fixture::new();
        for (at, key, value, branch) in [(1, "a", "1", "main"), (2, "b", "2", "feature/b"), (3, "c", "3", "feature/c")] {
            fx.tracking.seed_record(
                NewTrackingRecord::new("v9", MigrationStatus::Applied, Timestamp::new(at))
                    .with_branch(branch)
                    .with_meta(key, value),
            );
        }
        let issue = conflict(&fx, "v9");
        assert!(dispatch(RecoveryAction::ConsolidateRecords, &issue, &fx.ctx()));

        let left = fx.tracking.find_by_version("v9").unwrap();
        assert_eq!(left.len(), 1);
        let meta = &left[0].metadata;
        for (key, value) in [("a", "1"), ("b", "2"), ("c", "3")] {
            assert_eq!(meta[key], value);
        }
        assert!(meta.contains_key(meta_keys::CONSOLIDATED_AT));
        assert_eq!(meta[meta_keys::CONSOLIDATED_FROM_COUNT], "3");
        assert_eq!(left[0].branch.as_deref(), Some("feature/c"));

        let from: serde_json::Value = serde_json::from_str(&meta[meta_keys::CONSOLIDATED_FROM]).unwrap();
        assert_eq!(
            from,
            serde_json::json!([{"id": 1, "branch": "main"}, {"id": 2, "branch": "feature/b"}])
        );
    }

    #[test]
    fn consolidate_newer_value_wins_on_collision() {
        let fx = Fixture::new();
        fx.tracking.seed_record(
            NewTrackingRecord::new("v9", MigrationStatus::Applied, Timestamp::new(5)).with_meta("k", "old"),
        );
        fx.tracking.seed_record(
            NewTrackingRecord::new("v9", MigrationStatus::Applied, Timestamp::new(9)).with_meta("k", "new"),
        );
        assert!(dispatch(RecoveryAction::ConsolidateRecords, &conflict(&fx, "v9"), &fx.ctx()));
        assert_eq!(fx.tracking.find_by_version("v9").unwrap()[0].metadata["k"], "new");
    }

    #[test]
    fn remove_duplicates_prefers_applied_over_newer() {
        let fx = Fixture::new();
        let applied = fx.tracking.seed("v9", MigrationStatus::Applied, 1);
        fx.tracking.seed("v9", MigrationStatus::RolledBack, 50);
        fx.tracking.seed("v9", MigrationStatus::RolledBack, 100);

        let removed = remove_duplicates(&conflict(&fx, "v9"), &fx.ctx()).unwrap();
        assert_eq!(removed, 2);
        let left = fx.tracking.find_by_version("v9").unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, applied.id);
    }

    #[test]
    fn remove_duplicates_keeps_newest_without_applied() {
        let fx = Fixture::new();
        fx.tracking.seed("v9", MigrationStatus::RolledBack, 10);
        let newest = fx.tracking.seed("v9", MigrationStatus::Orphaned, 20);
        assert_eq!(remove_duplicates(&conflict(&fx, "v9"), &fx.ctx()).unwrap(), 1);
        assert_eq!(fx.tracking.find_by_version("v9").unwrap()[0].id, newest.id);
    }
}
