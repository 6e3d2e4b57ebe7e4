//! Runs every checker and aggregates what they find.

use std::fmt::Write;

use migtrack_types::Issue;

use crate::checkers::{
    FileChecker, IssueChecker, RollbackChecker, SchemaChecker, VersionConflictChecker,
};
use crate::RecoveryContext;

/// Aggregates checker output. A failing checker is logged and skipped so
/// the remaining checkers still report.
pub struct RecoveryAnalyzer<'a> {
    checkers: Vec<Box<dyn IssueChecker + 'a>>,
    issues: Vec<Issue>,
    failed: Vec<&'static str>,
}

impl<'a> RecoveryAnalyzer<'a> {
    /// The standard checker set, in order: rollback, schema, file, version conflict.
    pub fn new(ctx: &RecoveryContext<'a>, stuck_rollback_timeout_secs: u64) -> Self {
        Self::with_checkers(vec![
            Box::new(RollbackChecker::new(ctx.tracking, ctx.clock, stuck_rollback_timeout_secs)),
            Box::new(SchemaChecker::new(ctx.tracking, ctx.schema)),
            Box::new(FileChecker::new(ctx.tracking, ctx.scripts)),
            Box::new(VersionConflictChecker::new(ctx.tracking)),
        ])
    }

    pub fn with_checkers(checkers: Vec<Box<dyn IssueChecker + 'a>>) -> Self {
        Self {
            checkers,
            issues: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Run every checker and replace the previous result.
    pub fn analyze(&mut self) -> Vec<Issue> {
        self.issues.clear();
        self.failed.clear();
        for checker in &self.checkers {
            match checker.check() {
                Ok(found) => {
                    tracing::debug!(checker = checker.name(), issues = found.len(), "checker finished");
                    self.issues.extend(found);
                }
                Err(e) => {
                    tracing::error!(checker = checker.name(), error = %e, "checker failed, continuing");
                    self.failed.push(checker.name());
                }
            }
        }
        tracing::info!(issues = self.issues.len(), failed_checkers = self.failed.len(), "analysis complete");
        self.issues.clone()
    }

    /// Whether the last analysis found anything.
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Checkers that errored during the last analysis.
    pub fn failed_checkers(&self) -> &[&'static str] {
        &self.failed
    }

    /// Numbered plain-text rendering of the last analysis.
    pub fn format_analysis_report(&self) -> String {
        let mut out = String::new();
        if self.issues.is_empty() {
            out.push_str("No migration issues detected.\n");
        } else {
            let _ = writeln!(out, "Found {} migration issue(s):", self.issues.len());
            for (n, issue) in self.issues.iter().enumerate() {
                let options: Vec<&str> = issue.recovery_options.iter().map(|a| a.as_str()).collect();
                let _ = writeln!(out);
                let _ = writeln!(
                    out,
                    "{}. [{}] {} {}",
                    n + 1,
                    issue.severity.as_str().to_uppercase(),
                    issue.kind,
                    issue.version
                );
                let _ = writeln!(out, "   {}", issue.description);
                let _ = writeln!(out, "   Options: {}", options.join(", "));
            }
        }
        if !self.failed.is_empty() {
            let _ = writeln!(out, "\nChecks that could not run: {}", self.failed.join(", "));
        }
        out
    }
}
