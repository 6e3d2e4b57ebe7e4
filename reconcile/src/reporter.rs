//! The reconciliation reporter.

use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use migtrack_store::TrackingStore;
use migtrack_types::{MigrationStatus, TrackingRecord};
use migtrack_vcs::VcsClient;

use crate::ReconcileError;

/// Which branches count as authoritative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Targets {
    /// Single-branch mode: only trunk counts.
    Trunk(String),
    /// Multi-branch mode: a migration is accounted for if any listed branch has it.
    Branches(Vec<String>),
}

impl Targets {
    /// Trunk mode when `branches` is empty, multi-branch otherwise.
    pub fn from_config(main_branch: &str, branches: &[String]) -> Self {
        if branches.is_empty() {
            Self::Trunk(main_branch.to_string())
        } else {
            Self::Branches(branches.to_vec())
        }
    }

    pub fn names(&self) -> Vec<String> {
        match self {
            Self::Trunk(branch) => vec![branch.clone()],
            Self::Branches(branches) => branches.clone(),
        }
    }
}

/// Versions present in a target branch but never run locally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Missing {
    /// Single-branch mode.
    Flat(Vec<String>),
    /// Multi-branch mode, keyed by branch; branches with no gaps are omitted.
    PerBranch(BTreeMap<String, Vec<String>>),
}

impl Missing {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Flat(versions) => versions.is_empty(),
            Self::PerBranch(map) => map.is_empty(),
        }
    }

    /// Number of distinct missing versions across all branches.
    pub fn count(&self) -> usize {
        match self {
            Self::Flat(versions) => versions.len(),
            Self::PerBranch(map) => map.values().flatten().collect::<BTreeSet<_>>().len(),
        }
    }
}

/// Everything the reporter knows, in one serializable value.
#[derive(Clone, Debug, Serialize)]
pub struct ReconciliationSummary {
    pub targets: Vec<String>,
    pub orphaned: Vec<String>,
    pub missing: Missing,
    pub synced_count: usize,
}

/// Compares `applied` tracking records with target-branch inventories.
///
/// Read-only. Ledger and VCS answers are fetched once and memoized, so
/// repeated queries on one reporter see a consistent snapshot.
pub struct ReconciliationReporter<'a> {
    tracking: &'a dyn TrackingStore,
    vcs: &'a dyn VcsClient,
    targets: Targets,
    records: OnceCell<Vec<TrackingRecord>>,
    inventories: OnceCell<BTreeMap<String, BTreeSet<String>>>,
}

fn memo<'c, T, E>(
    cell: &'c OnceCell<T>,
    init: impl FnOnce() -> Result<T, E>,
) -> Result<&'c T, E> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = init()?;
    Ok(cell.get_or_init(|| value))
}

impl<'a> ReconciliationReporter<'a> {
    pub fn new(tracking: &'a dyn TrackingStore, vcs: &'a dyn VcsClient, targets: Targets) -> Self {
        Self {
            tracking,
            vcs,
            targets,
            records: OnceCell::new(),
            inventories: OnceCell::new(),
        }
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    fn records(&self) -> Result<&Vec<TrackingRecord>, ReconcileError> {
        memo(&self.records, || Ok(self.tracking.all()?))
    }

    fn inventories(&self) -> Result<&BTreeMap<String, BTreeSet<String>>, ReconcileError> {
        memo(&self.inventories, || {
            let raw = self.vcs.migration_versions_in_branches(&self.targets.names())?;
            tracing::debug!(branches = raw.len(), "fetched branch inventories");
            Ok(raw
                .into_iter()
                .map(|(branch, versions)| (branch, versions.into_iter().collect()))
                .collect())
        })
    }

    fn in_any_target(&self, version: &str) -> Result<bool, ReconcileError> {
        Ok(self
            .inventories()?
            .values()
            .any(|inventory| inventory.contains(version)))
    }

    fn applied(&self) -> Result<impl Iterator<Item = &TrackingRecord>, ReconcileError> {
        Ok(self
            .records()?
            .iter()
            .filter(|r| r.status == MigrationStatus::Applied))
    }

    /// Applied records whose version is absent from every target branch.
    pub fn orphaned(&self) -> Result<Vec<TrackingRecord>, ReconcileError> {
        let mut orphaned = Vec::new();
        for record in self.applied()? {
            if !self.in_any_target(&record.version)? {
                orphaned.push(record.clone());
            }
        }
        Ok(orphaned)
    }

    /// Target-branch versions absent from the tracking ledger.
    pub fn missing(&self) -> Result<Missing, ReconcileError> {
        let tracked: BTreeSet<&str> = self.records()?.iter().map(|r| r.version.as_str()).collect();
        let inventories = self.inventories()?;
        let gaps = |inventory: &BTreeSet<String>| -> Vec<String> {
            inventory
                .iter()
                .filter(|v| !tracked.contains(v.as_str()))
                .cloned()
                .collect()
        };

        Ok(match &self.targets {
            Targets::Trunk(branch) => {
                Missing::Flat(inventories.get(branch).map(gaps).unwrap_or_default())
            }
            Targets::Branches(_) => Missing::PerBranch(
                inventories
                    .iter()
                    .map(|(branch, inventory)| (branch.clone(), gaps(inventory)))
                    .filter(|(_, versions)| !versions.is_empty())
                    .collect(),
            ),
        })
    }

    /// Applied records whose version appears in at least one target branch.
    pub fn synced_count(&self) -> Result<usize, ReconcileError> {
        let mut count = 0;
        for record in self.applied()? {
            if self.in_any_target(&record.version)? {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn summary(&self) -> Result<ReconciliationSummary, ReconcileError> {
        Ok(ReconciliationSummary {
            targets: self.targets.names(),
            orphaned: self.orphaned()?.into_iter().map(|r| r.version).collect(),
            missing: self.missing()?,
            synced_count: self.synced_count()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migtrack_nullables::{NullTrackingStore, NullVcs};
    use migtrack_types::{NewTrackingRecord, Timestamp};

    #[test]
    fn trunk_scenario_orphaned_and_missing() {
        let tracking = NullTrackingStore::new();
        tracking.seed_record(
            NewTrackingRecord::new("20240101000001", MigrationStatus::Applied, Timestamp::EPOCH)
                .with_branch("feature/x"),
        );
        let vcs = NullVcs::new("feature/x").with_branch("main", ["20240101000002"]);
        let reporter = ReconciliationReporter::new(&tracking, &vcs, Targets::Trunk("main".into()));

        let orphaned: Vec<_> = reporter.orphaned().unwrap().into_iter().map(|r| r.version).collect();
        assert_eq!(orphaned, vec!["20240101000001"]);
        assert_eq!(
            reporter.missing().unwrap(),
            Missing::Flat(vec!["20240101000002".into()])
        );
        assert_eq!(reporter.synced_count().unwrap(), 0);
    }

    #[test]
    fn rolled_back_records_are_never_orphaned() {
        let tracking = NullTrackingStore::new();
        tracking.seed("1", MigrationStatus::RolledBack, 0);
        tracking.seed("2", MigrationStatus::RollingBack, 0);
        let vcs = NullVcs::new("main").with_branch("main", Vec::<String>::new());
        let reporter = ReconciliationReporter::new(&tracking, &vcs, Targets::Trunk("main".into()));
        assert!(reporter.orphaned().unwrap().is_empty());
    }

    #[test]
    fn multi_branch_omits_branches_without_gaps() {
        let tracking = NullTrackingStore::new();
        tracking.seed("1", MigrationStatus::Applied, 0);
        tracking.seed("3", MigrationStatus::Applied, 0);
        let vcs = NullVcs::new("main")
            .with_branch("main", ["1"])
            .with_branch("develop", ["1", "2"]);
        let reporter = ReconciliationReporter::new(
            &tracking,
            &vcs,
            Targets::Branches(vec!["main".into(), "develop".into()]),
        );

        let mut expected = BTreeMap::new();
        expected.insert("develop".to_string(), vec!["2".to_string()]);
        assert_eq!(reporter.missing().unwrap(), Missing::PerBranch(expected));
        let orphaned: Vec<_> = reporter.orphaned().unwrap().into_iter().map(|r| r.version).collect();
        assert_eq!(orphaned, vec!["3"]);
        assert_eq!(reporter.synced_count().unwrap(), 1);
    }

    #[test]
    fn answers_are_memoized_per_reporter() {
        let tracking = NullTrackingStore::new();
        tracking.seed("1", MigrationStatus::Applied, 0);
        let vcs = NullVcs::new("main").with_branch("main", ["1", "2"]);
        let reporter = ReconciliationReporter::new(&tracking, &vcs, Targets::Trunk("main".into()));
        assert_eq!(reporter.synced_count().unwrap(), 1);

        vcs.set_failing(true);
        tracking.set_failing(true);
        assert_eq!(reporter.missing().unwrap().count(), 1);
        assert!(reporter.orphaned().unwrap().is_empty());
    }

    #[test]
    fn vcs_failure_surfaces_as_error() {
        let tracking = NullTrackingStore::new();
        let vcs = NullVcs::new("main");
        let reporter = ReconciliationReporter::new(&tracking, &vcs, Targets::Trunk("main".into()));
        assert!(matches!(reporter.missing(), Err(ReconcileError::Vcs(_))));
    }

    #[test]
    fn summary_serializes_flat_missing_as_list() {
        let tracking = NullTrackingStore::new();
        let vcs = NullVcs::new("main").with_branch("main", ["9"]);
        let reporter = ReconciliationReporter::new(&tracking, &vcs, Targets::Trunk("main".into()));
        let json = serde_json::to_value(reporter.summary().unwrap()).unwrap();
        assert_eq!(json["missing"], serde_json::json!(["9"]));
        assert_eq!(json["targets"], serde_json::json!(["main"]));
    }
}
