use migtrack_database::MigrationScripts;
use migtrack_store::TrackingStore;
use migtrack_types::{Issue, IssueKind};

use super::IssueChecker;
use crate::RecoveryError;

/// Flags live records whose script is no longer on disk.
pub struct FileChecker<'a> {
    tracking: &'a dyn TrackingStore,
    scripts: &'a MigrationScripts,
}

impl<'a> FileChecker<'a> {
    pub fn new(tracking: &'a dyn TrackingStore, scripts: &'a MigrationScripts) -> Self {
        Self { tracking, scripts }
    }
}

impl IssueChecker for FileChecker<'_> {
    fn name(&self) -> &'static str {
        "file"
    }

    fn check(&self) -> Result<Vec<Issue>, RecoveryError> {
        let on_disk: std::collections::BTreeSet<String> =
            self.scripts.list()?.into_iter().map(|f| f.version).collect();

        let issues = self
            .tracking
            .all()?
            .into_iter()
            .filter(|r| r.status.expects_script())
            .filter(|r| !on_disk.contains(&r.version))
            .map(|record| {
                let description = format!(
                    "Migration {} is {} but no script was found in {}",
                    record.version,
                    record.status,
                    self.scripts.dir().display()
                );
                Issue::new(IssueKind::MissingFile, record.version.clone(), vec![record], description)
            })
            .collect();
        Ok(issues)
    }
}
