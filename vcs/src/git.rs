//! `VcsClient` backed by the `git` command line.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use migtrack_types::script::version_from_filename;
use migtrack_utils::{run_with_timeout, ProcessOutput};

use crate::{VcsClient, VcsError};

/// Runs `git -C <repo_root> ...` with a timeout and parses the output into
/// typed answers.
pub struct GitClient {
    repo_root: PathBuf,
    migrations_dir: String,
    timeout: Duration,
}

impl GitClient {
    /// `migrations_dir` is relative to the repository root.
    pub fn new(repo_root: impl Into<PathBuf>, migrations_dir: &str, timeout: Duration) -> Self {
        Self {
            repo_root: repo_root.into(),
            migrations_dir: migrations_dir.trim_end_matches('/').replace('\\', "/"),
            timeout,
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    fn run(&self, args: &[&str]) -> Result<ProcessOutput, VcsError> {
        let mut command = Command::new("git");
        command.arg("-C").arg(&self.repo_root).args(args);
        tracing::trace!(?args, "running git");
        Ok(run_with_timeout(command, self.timeout)?)
    }

    /// Run and require a zero exit status.
    fn run_ok(&self, args: &[&str]) -> Result<ProcessOutput, VcsError> {
        let output = self.run(args)?;
        if !output.success() {
            return Err(VcsError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                stderr: output.stderr_text(),
            });
        }
        Ok(output)
    }

    fn dir_pathspec(&self) -> String {
        format!("{}/", self.migrations_dir)
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl VcsClient for GitClient {
    fn current_branch(&self) -> Result<String, VcsError> {
        let args = ["rev-parse", "--abbrev-ref", "HEAD"];
        let branch = self.run_ok(&args)?.stdout_text();
        if branch.is_empty() {
            return Err(VcsError::InvalidOutput {
                command: format!("git {}", args.join(" ")),
                detail: "empty branch name".into(),
            });
        }
        Ok(branch)
    }

    fn migration_versions_in_branch(&self, branch: &str) -> Result<Vec<String>, VcsError> {
        let pathspec = self.dir_pathspec();
        let output = self.run_ok(&["ls-tree", "--name-only", branch, "--", &pathspec])?;
        let mut versions: Vec<String> = output
            .stdout_text()
            .lines()
            .filter_map(|line| version_from_filename(file_name(line.trim())))
            .map(str::to_string)
            .collect();
        versions.sort();
        versions.dedup();
        Ok(versions)
    }

    fn find_script_in_history(&self, version: &str) -> Result<Option<String>, VcsError> {
        let pathspec = self.dir_pathspec();
        let output = self.run_ok(&[
            "log",
            "--all",
            "--format=",
            "--name-only",
            "--diff-filter=A",
            "--",
            &pathspec,
        ])?;
        Ok(output
            .stdout_text()
            .lines()
            .map(str::trim)
            .find(|path| version_from_filename(file_name(path)) == Some(version))
            .map(str::to_string))
    }

    fn find_commit_touching(&self, path: &str) -> Result<Option<String>, VcsError> {
        // Lowercase `d` excludes deletions: we want a commit where the file still has content.
        let output = self.run_ok(&["log", "--all", "-1", "--format=%H", "--diff-filter=d", "--", path])?;
        let commit = output.stdout_text();
        Ok((!commit.is_empty()).then_some(commit))
    }

    fn read_blob(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>, VcsError> {
        let object = format!("{commit}:{path}");
        if !self.run(&["cat-file", "-e", &object])?.success() {
            return Ok(None);
        }
        Ok(Some(self.run_ok(&["cat-file", "blob", &object])?.stdout))
    }

    fn user_name(&self) -> Result<Option<String>, VcsError> {
        // `git config` exits 1 when the key is unset.
        let output = self.run(&["config", "user.name"])?;
        let name = output.stdout_text();
        Ok((output.success() && !name.is_empty()).then_some(name))
    }
}
