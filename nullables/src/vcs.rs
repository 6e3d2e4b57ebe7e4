//! Nullable version control: scripted branch inventories and history.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use migtrack_vcs::{VcsClient, VcsError};

struct HistoryEntry {
    commit: String,
    content: Vec<u8>,
}

/// An in-memory `VcsClient`.
pub struct NullVcs {
    current: String,
    branches: Mutex<BTreeMap<String, Vec<String>>>,
    history: Mutex<BTreeMap<String, HistoryEntry>>,
    user: Option<String>,
    failing: AtomicBool,
}

impl NullVcs {
    pub fn new(current_branch: &str) -> Self {
        Self {
            current: current_branch.to_string(),
            branches: Mutex::new(BTreeMap::new()),
            history: Mutex::new(BTreeMap::new()),
            user: None,
            failing: AtomicBool::new(false),
        }
    }

    pub fn with_branch<I, S>(self, branch: &str, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.branches.lock().unwrap().insert(
            branch.to_string(),
            versions.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Record that `path` existed with `content` at `commit`.
    pub fn with_history(self, path: &str, commit: &str, content: &[u8]) -> Self {
        self.history.lock().unwrap().insert(
            path.to_string(),
            HistoryEntry {
                commit: commit.to_string(),
                content: content.to_vec(),
            },
        );
        self
    }

    pub fn with_user(mut self, name: &str) -> Self {
        self.user = Some(name.to_string());
        self
    }

    /// Make every call fail as if `git` were broken.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self, command: &str) -> Result<(), VcsError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(VcsError::CommandFailed {
                command: format!("git {command}"),
                stderr: "fatal: not a git repository (nullable forced failure)".into(),
            });
        }
        Ok(())
    }
}

impl VcsClient for NullVcs {
    fn current_branch(&self) -> Result<String, VcsError> {
        self.check("rev-parse")?;
        Ok(self.current.clone())
    }

    fn migration_versions_in_branch(&self, branch: &str) -> Result<Vec<String>, VcsError> {
        self.check("ls-tree")?;
        self.branches
            .lock()
            .unwrap()
            .get(branch)
            .cloned()
            .ok_or_else(|| VcsError::CommandFailed {
                command: format!("git ls-tree {branch}"),
                stderr: format!("fatal: Not a valid object name {branch}"),
            })
    }

    fn find_script_in_history(&self, version: &str) -> Result<Option<String>, VcsError> {
        self.check("log")?;
        Ok(self
            .history
            .lock()
            .unwrap()
            .keys()
            .find(|path| {
                let name = path.rsplit('/').next().unwrap_or_default();
                migtrack_types::script::version_from_filename(name) == Some(version)
            })
            .cloned())
    }

    fn find_commit_touching(&self, path: &str) -> Result<Option<String>, VcsError> {
        self.check("log")?;
        Ok(self
            .history
            .lock()
            .unwrap()
            .get(path)
            .map(|entry| entry.commit.clone()))
    }

    fn read_blob(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>, VcsError> {
        self.check("cat-file")?;
        Ok(self
            .history
            .lock()
            .unwrap()
            .get(path)
            .filter(|entry| entry.commit == commit)
            .map(|entry| entry.content.clone()))
    }

    fn user_name(&self) -> Result<Option<String>, VcsError> {
        self.check("config")?;
        Ok(self.user.clone())
    }
}
