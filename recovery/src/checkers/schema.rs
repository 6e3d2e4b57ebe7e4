use migtrack_store::{SchemaLedger, TrackingStore};
use migtrack_types::{Issue, IssueKind, MigrationStatus};

use super::IssueChecker;
use crate::RecoveryError;

/// Compares the schema ledger with the tracking ledger in both directions.
pub struct SchemaChecker<'a> {
    tracking: &'a dyn TrackingStore,
    schema: &'a dyn SchemaLedger,
}

impl<'a> SchemaChecker<'a> {
    pub fn new(tracking: &'a dyn TrackingStore, schema: &'a dyn SchemaLedger) -> Self {
        Self { tracking, schema }
    }
}

impl IssueChecker for SchemaChecker<'_> {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn check(&self) -> Result<Vec<Issue>, RecoveryError> {
        let schema_versions = self.schema.versions()?;
        let records = self.tracking.all()?;
        let tracked: std::collections::BTreeSet<&str> =
            records.iter().map(|r| r.version.as_str()).collect();

        // Versions come from a set, so each orphan is reported once.
        let mut issues: Vec<Issue> = schema_versions
            .iter()
            .filter(|v| !tracked.contains(v.as_str()))
            .map(|version| {
                Issue::new(
                    IssueKind::OrphanedSchema,
                    version.clone(),
                    Vec::new(),
                    format!("Version {version} is in schema_migrations but has no tracking record"),
                )
            })
            .collect();

        issues.extend(
            records
                .into_iter()
                .filter(|r| r.status == MigrationStatus::Applied)
                .filter(|r| !schema_versions.contains(&r.version))
                .map(|record| {
                    let description = format!(
                        "Migration {} is tracked as applied but missing from schema_migrations",
                        record.version
                    );
                    Issue::new(IssueKind::MissingFromSchema, record.version.clone(), vec![record], description)
                }),
        );
        Ok(issues)
    }
}
