//! The VCS collaborator interface.

use std::collections::BTreeMap;

use crate::VcsError;

/// What the tracker needs to know from version control.
///
/// Every query distinguishes "absent" (`Ok(None)` / empty) from "failed"
/// (`Err`).
pub trait VcsClient: Send + Sync {
    /// Name of the checked-out branch.
    fn current_branch(&self) -> Result<String, VcsError>;

    /// Migration versions whose scripts exist in `branch`.
    fn migration_versions_in_branch(&self, branch: &str) -> Result<Vec<String>, VcsError>;

    /// Inventories for several branches at once.
    fn migration_versions_in_branches(
        &self,
        branches: &[String],
    ) -> Result<BTreeMap<String, Vec<String>>, VcsError> {
        let mut inventories = BTreeMap::new();
        for branch in branches {
            inventories.insert(branch.clone(), self.migration_versions_in_branch(branch)?);
        }
        Ok(inventories)
    }

    /// Repository-relative path of a migration script for `version` found
    /// anywhere in history (including deleted files).
    fn find_script_in_history(&self, version: &str) -> Result<Option<String>, VcsError>;

    /// The most recent commit in which `path` exists with content.
    fn find_commit_touching(&self, path: &str) -> Result<Option<String>, VcsError>;

    /// Content of `path` at `commit`.
    fn read_blob(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>, VcsError>;

    /// The configured author name, if any.
    fn user_name(&self) -> Result<Option<String>, VcsError>;
}
