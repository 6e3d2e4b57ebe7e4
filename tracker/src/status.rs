//! The `status` report.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use migtrack_reconcile::Missing;
use migtrack_types::MigrationStatus;

use crate::{TrackerContext, TrackerError};

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub current_branch: String,
    pub targets: Vec<String>,
    pub orphaned: Vec<String>,
    pub missing: Missing,
    pub synced_count: usize,
    /// Tracking records per status; every status is listed.
    pub counts: BTreeMap<String, usize>,
}

pub fn status(ctx: &TrackerContext<'_>) -> Result<StatusReport, TrackerError> {
    let current_branch = ctx.vcs.current_branch()?;
    let summary = ctx.reporter().summary()?;

    let mut counts: BTreeMap<String, usize> = MigrationStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    for record in ctx.tracking.all()? {
        *counts.entry(record.status.as_str().to_string()).or_default() += 1;
    }

    Ok(StatusReport {
        current_branch,
        targets: summary.targets,
        orphaned: summary.orphaned,
        missing: summary.missing,
        synced_count: summary.synced_count,
        counts,
    })
}

impl StatusReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Branch:  {}", self.current_branch);
        let _ = writeln!(out, "Targets: {}", self.targets.join(", "));
        let _ = writeln!(out, "Synced:  {}", self.synced_count);

        if self.orphaned.is_empty() {
            let _ = writeln!(out, "Orphaned: none");
        } else {
            let _ = writeln!(out, "Orphaned ({}):", self.orphaned.len());
            for version in &self.orphaned {
                let _ = writeln!(out, "  {version}");
            }
        }

        match &self.missing {
            Missing::Flat(versions) if versions.is_empty() => {
                let _ = writeln!(out, "Missing: none");
            }
            Missing::PerBranch(map) if map.is_empty() => {
                let _ = writeln!(out, "Missing: none");
            }
            Missing::Flat(versions) => {
                let _ = writeln!(out, "Missing ({}):", versions.len());
                for version in versions {
                    let _ = writeln!(out, "  {version}");
                }
            }
            Missing::PerBranch(map) => {
                let _ = writeln!(out, "Missing ({}):", self.missing.count());
                for (branch, versions) in map {
                    let _ = writeln!(out, "  {branch}: {}", versions.join(", "));
                }
            }
        }

        let counts: Vec<String> = self
            .counts
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(status, n)| format!("{status}={n}"))
            .collect();
        let _ = writeln!(
            out,
            "Records: {}",
            if counts.is_empty() { "none".to_string() } else { counts.join(" ") }
        );
        out
    }
}
