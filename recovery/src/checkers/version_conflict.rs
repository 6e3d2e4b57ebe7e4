use std::collections::BTreeMap;

use migtrack_store::TrackingStore;
use migtrack_types::{Issue, IssueKind, TrackingRecord};

use super::IssueChecker;
use crate::RecoveryError;

/// Flags versions carried by more than one tracking record.
pub struct VersionConflictChecker<'a> {
    tracking: &'a dyn TrackingStore,
}

impl<'a> VersionConflictChecker<'a> {
    pub fn new(tracking: &'a dyn TrackingStore) -> Self {
        Self { tracking }
    }
}

impl IssueChecker for VersionConflictChecker<'_> {
    fn name(&self) -> &'static str {
        "version_conflict"
    }

    fn check(&self) -> Result<Vec<Issue>, RecoveryError> {
        let mut groups: BTreeMap<String, Vec<TrackingRecord>> = BTreeMap::new();
        for record in self.tracking.all()? {
            groups.entry(record.version.clone()).or_default().push(record);
        }

        let issues = groups
            .into_iter()
            .filter(|(_, records)| records.len() > 1)
            .map(|(version, records)| {
                let branches: Vec<&str> = records
                    .iter()
                    .map(|r| r.branch.as_deref().unwrap_or("unknown"))
                    .collect();
                let description = format!(
                    "Version {version} has {} tracking records (branches: {})",
                    records.len(),
                    branches.join(", ")
                );
                Issue::new(IssueKind::VersionConflict, version, records, description)
            })
            .collect();
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migtrack_nullables::NullTrackingStore;
    use migtrack_types::{MigrationStatus, NewTrackingRecord, Timestamp};

    #[test]
    fn one_issue_per_duplicated_version() {
        let tracking = NullTrackingStore::new();
        tracking.seed_record(
            NewTrackingRecord::new("v9", MigrationStatus::Applied, Timestamp::new(1)).with_branch("main"),
        );
        tracking.seed_record(
            NewTrackingRecord::new("v9", MigrationStatus::Applied, Timestamp::new(2)).with_branch("feature/a"),
        );
        tracking.seed("v10", MigrationStatus::Applied, 3);

        let issues = VersionConflictChecker::new(&tracking).check().unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].version, "v9");
        assert_eq!(issues[0].migrations.len(), 2);
        assert!(issues[0].description.contains("main, feature/a"));
    }
}
