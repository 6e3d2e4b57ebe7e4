//! The `doctor` command: environment diagnostics.

use std::fmt::{self, Write};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use serde::Serialize;

use migtrack_database::Adapter;
use migtrack_recovery::{LogOperator, RecoveryAnalyzer};
use migtrack_store_lmdb::IntegrityReport;
use migtrack_utils::run_with_timeout;

use crate::{TrackerConfig, TrackerContext};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name,
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    pub fn is_healthy(&self) -> bool {
        self.checks.iter().all(|c| c.status != CheckStatus::Fail)
    }

    pub fn check(&self, name: &str) -> Option<&DoctorCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for check in &self.checks {
            let _ = writeln!(out, "[{:>4}] {:<16} {}", check.status, check.name, check.detail);
        }
        out
    }
}

/// Whether backups could be written under `dir`, without creating it.
fn backup_dir_check(dir: &Path) -> DoctorCheck {
    let shown = dir.display();
    let Some(existing) = dir.ancestors().find(|p| p.exists()) else {
        return DoctorCheck::new("backup_dir", CheckStatus::Warn, format!("{shown}: no existing parent"));
    };
    let readonly = match fs::metadata(existing) {
        Ok(meta) if meta.is_dir() => meta.permissions().readonly(),
        Ok(_) => {
            let detail = format!("{} is not a directory", existing.display());
            return DoctorCheck::new("backup_dir", CheckStatus::Warn, detail);
        }
        Err(e) => return DoctorCheck::new("backup_dir", CheckStatus::Warn, format!("{shown}: {e}")),
    };
    match (readonly, existing == dir) {
        (true, _) => DoctorCheck::new("backup_dir", CheckStatus::Warn, format!("{} is read-only", existing.display())),
        (false, true) => DoctorCheck::new("backup_dir", CheckStatus::Ok, format!("{shown} is writable")),
        (false, false) => DoctorCheck::new(
            "backup_dir",
            CheckStatus::Ok,
            format!("{shown} will be created on first backup"),
        ),
    }
}

/// `<tool> --version` for engines whose backups shell out, with the dump timeout.
fn dump_tool_probe(config: &TrackerConfig) -> Option<(Command, Duration)> {
    let tool = match config.database.adapter {
        Adapter::Postgresql => "pg_dump",
        Adapter::Mysql => "mysqldump",
        _ => return None,
    };
    let mut cmd = Command::new(tool);
    cmd.arg("--version");
    Some((cmd, Duration::from_secs(config.dump_timeout_secs)))
}

/// Run every diagnostic. `integrity` is the tracking-ledger integrity
/// result when the caller could compute one.
pub fn run_doctor(ctx: &TrackerContext<'_>, integrity: Option<&IntegrityReport>) -> DoctorReport {
    let config = ctx.config;
    let mut checks = Vec::new();

    checks.push(match ctx.vcs.current_branch() {
        Ok(branch) => DoctorCheck::new("vcs", CheckStatus::Ok, format!("on branch {branch}")),
        Err(e) => DoctorCheck::new("vcs", CheckStatus::Fail, e.to_string()),
    });

    checks.push(match ctx.vcs.migration_versions_in_branch(&config.main_branch) {
        Ok(versions) => DoctorCheck::new(
            "main_branch",
            CheckStatus::Ok,
            format!("{} has {} migration(s)", config.main_branch, versions.len()),
        ),
        Err(e) => DoctorCheck::new("main_branch", CheckStatus::Fail, e.to_string()),
    });

    checks.push(if ctx.scripts.dir().is_dir() {
        match ctx.scripts.list() {
            Ok(files) => DoctorCheck::new(
                "migrations_dir",
                CheckStatus::Ok,
                format!("{} script(s) in {}", files.len(), ctx.scripts.dir().display()),
            ),
            Err(e) => DoctorCheck::new("migrations_dir", CheckStatus::Fail, e.to_string()),
        }
    } else {
        DoctorCheck::new(
            "migrations_dir",
            CheckStatus::Warn,
            format!("{} does not exist", ctx.scripts.dir().display()),
        )
    });

    checks.push(match integrity {
        Some(report) if report.is_healthy() => DoctorCheck::new(
            "tracking_ledger",
            CheckStatus::Ok,
            format!("{} entries in {} databases", report.total_entries, report.databases_checked),
        ),
        Some(report) => DoctorCheck::new("tracking_ledger", CheckStatus::Fail, report.errors.join("; ")),
        None => DoctorCheck::new("tracking_ledger", CheckStatus::Warn, "integrity not checked"),
    });

    checks.push(match ctx.schema.versions() {
        Ok(versions) => DoctorCheck::new("schema_ledger", CheckStatus::Ok, format!("{} version(s) recorded", versions.len())),
        Err(e) => DoctorCheck::new("schema_ledger", CheckStatus::Fail, e.to_string()),
    });

    checks.push(if config.database.is_in_memory() {
        DoctorCheck::new("backup_dir", CheckStatus::Ok, "in-memory database, backups not needed")
    } else {
        backup_dir_check(&config.backup_path())
    });

    if let Some((cmd, timeout)) = dump_tool_probe(config) {
        checks.push(match run_with_timeout(cmd, timeout) {
            Ok(out) if out.success() => DoctorCheck::new("dump_tool", CheckStatus::Ok, out.stdout_text()),
            Ok(out) => DoctorCheck::new("dump_tool", CheckStatus::Warn, out.stderr_text()),
            Err(e) => DoctorCheck::new("dump_tool", CheckStatus::Warn, format!("{e}; backups will be skipped")),
        });
    }

    let operator = LogOperator;
    let mut analyzer = RecoveryAnalyzer::new(&ctx.recovery(&operator), config.stuck_rollback_timeout_secs);
    let issues = analyzer.analyze();
    let blocking = issues.iter().filter(|i| i.severity.is_blocking()).count();
    checks.push(if !analyzer.failed_checkers().is_empty() {
        DoctorCheck::new(
            "issues",
            CheckStatus::Fail,
            format!("checks could not run: {}", analyzer.failed_checkers().join(", ")),
        )
    } else if blocking > 0 {
        DoctorCheck::new("issues", CheckStatus::Fail, format!("{} issue(s), {blocking} critical or high", issues.len()))
    } else if !issues.is_empty() {
        DoctorCheck::new("issues", CheckStatus::Warn, format!("{} issue(s)", issues.len()))
    } else {
        DoctorCheck::new("issues", CheckStatus::Ok, "no issues detected")
    });

    let report = DoctorReport { checks };
    tracing::info!(healthy = report.is_healthy(), "doctor finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[test]
    fn healthy_workspace() {
        let fx = Fixture::new(&["1"]);
        fx.applied_with_script("1");
        let integrity = IntegrityReport {
            databases_checked: 2,
            total_entries: 3,
            errors: Vec::new(),
        };
        let report = run_doctor(&fx.ctx(), Some(&integrity));
        assert!(report.is_healthy(), "{}", report.render_text());
        assert_eq!(report.check("vcs").unwrap().detail, "on branch feature/x");
        assert_eq!(report.check("issues").unwrap().status, CheckStatus::Ok);
        assert_eq!(report.check("backup_dir").unwrap().status, CheckStatus::Ok);
        assert!(report.check("dump_tool").is_none());
    }

    #[test]
    fn broken_vcs_and_missing_dir_are_reported() {
        let fx = Fixture::new(&[]);
        fx.vcs.set_failing(true);
        let report = run_doctor(&fx.ctx(), None);
        assert!(!report.is_healthy());
        assert_eq!(report.check("vcs").unwrap().status, CheckStatus::Fail);
        assert_eq!(report.check("migrations_dir").unwrap().status, CheckStatus::Warn);
        assert_eq!(report.check("tracking_ledger").unwrap().status, CheckStatus::Warn);
    }

    #[test]
    fn backup_dir_is_not_created_by_the_check() {
        let fx = Fixture::new(&["1"]);
        let report = run_doctor(&fx.ctx(), None);
        let check = report.check("backup_dir").unwrap();
        assert_eq!(check.status, CheckStatus::Ok);
        assert!(check.detail.ends_with("will be created on first backup"), "{}", check.detail);
        assert!(!fx.config.backup_path().exists());

        std::fs::create_dir_all(fx.config.backup_path()).unwrap();
        let report = run_doctor(&fx.ctx(), None);
        assert!(report.check("backup_dir").unwrap().detail.ends_with("is writable"));
    }

    #[test]
    fn dump_tool_probe_uses_the_dump_timeout() {
        let mut config = TrackerConfig::default();
        assert!(dump_tool_probe(&config).is_none());

        config.database.adapter = Adapter::Postgresql;
        config.vcs_timeout_secs = 30;
        config.dump_timeout_secs = 77;
        let (cmd, timeout) = dump_tool_probe(&config).unwrap();
        assert_eq!(cmd.get_program(), "pg_dump");
        assert_eq!(timeout, Duration::from_secs(77));
    }

    #[test]
    fn corrupt_ledger_fails() {
        let fx = Fixture::new(&[]);
        let integrity = IntegrityReport {
            databases_checked: 2,
            total_entries: 1,
            errors: vec!["tracking: record #1 does not decode".into()],
        };
        let report = run_doctor(&fx.ctx(), Some(&integrity));
        assert_eq!(report.check("tracking_ledger").unwrap().status, CheckStatus::Fail);
    }
}
