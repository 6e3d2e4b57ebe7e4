//! The `ci` check: a one-shot verdict with an exit code.

use std::fmt::{self, Write};
use std::str::FromStr;

use serde::Serialize;

use migtrack_recovery::{LogOperator, RecoveryAnalyzer};
use migtrack_types::ParseError;

use crate::TrackerContext;

/// How warnings affect the exit code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Warnings fail the build.
    Strict,
    /// Warnings exit 1.
    #[default]
    Warning,
    /// Like `Warning`, but missing migrations are not warnings.
    Permissive,
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::Warning => "warning",
            Self::Permissive => "permissive",
        })
    }
}

impl FromStr for Strictness {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "warning" => Ok(Self::Warning),
            "permissive" => Ok(Self::Permissive),
            other => Err(ParseError::UnknownStrictness(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ParseError::UnknownFormat(other.to_string())),
        }
    }
}

pub const EXIT_CLEAN: i32 = 0;
pub const EXIT_WARNING: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

#[derive(Debug, Serialize)]
pub struct CiReport {
    pub status: &'static str,
    pub strictness: Strictness,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub exit_code: i32,
}

impl CiReport {
    fn new(strictness: Strictness, errors: Vec<String>, warnings: Vec<String>) -> Self {
        let (status, exit_code) = if !errors.is_empty() {
            ("error", EXIT_ERROR)
        } else if !warnings.is_empty() {
            let code = if strictness == Strictness::Strict { EXIT_ERROR } else { EXIT_WARNING };
            ("warning", code)
        } else {
            ("clean", EXIT_CLEAN)
        };
        Self {
            status,
            strictness,
            errors,
            warnings,
            exit_code,
        }
    }

    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(self).unwrap_or_else(|e| {
                format!("{{\"status\":\"error\",\"errors\":[\"{e}\"]}}")
            }),
            OutputFormat::Text => {
                let mut out = String::new();
                for error in &self.errors {
                    let _ = writeln!(out, "ERROR: {error}");
                }
                for warning in &self.warnings {
                    let _ = writeln!(out, "WARNING: {warning}");
                }
                let _ = writeln!(
                    out,
                    "migtrack ci: {} ({} error(s), {} warning(s), strictness {})",
                    self.status,
                    self.errors.len(),
                    self.warnings.len(),
                    self.strictness
                );
                out
            }
        }
    }
}

/// Reconcile and analyze. Never fails: anything that cannot be checked is
/// itself an error in the report.
pub fn run_ci(ctx: &TrackerContext<'_>, strictness: Strictness) -> CiReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    match ctx.reporter().summary() {
        Ok(summary) => {
            for version in &summary.orphaned {
                warnings.push(format!("orphaned migration {version} is in no target branch"));
            }
            if strictness != Strictness::Permissive && !summary.missing.is_empty() {
                warnings.push(format!(
                    "{} migration(s) from target branches have not been run",
                    summary.missing.count()
                ));
            }
        }
        Err(e) => errors.push(format!("reconciliation failed: {e}")),
    }

    let operator = LogOperator;
    let mut analyzer = RecoveryAnalyzer::new(&ctx.recovery(&operator), ctx.config.stuck_rollback_timeout_secs);
    for issue in analyzer.analyze() {
        let line = format!("[{}] {} {}: {}", issue.severity, issue.kind, issue.version, issue.description);
        if issue.severity.is_blocking() {
            errors.push(line);
        } else {
            warnings.push(line);
        }
    }
    for checker in analyzer.failed_checkers() {
        warnings.push(format!("{checker} check could not run"));
    }

    let report = CiReport::new(strictness, errors, warnings);
    tracing::info!(status = report.status, exit_code = report.exit_code, "ci check finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use migtrack_store::SchemaLedger;
    use migtrack_types::MigrationStatus;

    #[test]
    fn clean_repository_exits_zero() {
        let fx = Fixture::new(&["1"]);
        fx.applied_with_script("1");
        let report = run_ci(&fx.ctx(), Strictness::Strict);
        assert_eq!(report.exit_code, EXIT_CLEAN);
        assert_eq!(report.status, "clean");
    }

    #[test]
    fn orphan_is_a_warning_unless_strict() {
        let fx = Fixture::new(&[]);
        fx.applied_with_script("1");
        assert_eq!(run_ci(&fx.ctx(), Strictness::Warning).exit_code, EXIT_WARNING);
        assert_eq!(run_ci(&fx.ctx(), Strictness::Permissive).exit_code, EXIT_WARNING);
        assert_eq!(run_ci(&fx.ctx(), Strictness::Strict).exit_code, EXIT_ERROR);
    }

    #[test]
    fn permissive_ignores_missing_migrations() {
        let fx = Fixture::new(&["2"]);
        assert_eq!(run_ci(&fx.ctx(), Strictness::Permissive).exit_code, EXIT_CLEAN);
        assert_eq!(run_ci(&fx.ctx(), Strictness::Warning).exit_code, EXIT_WARNING);
    }

    #[test]
    fn high_severity_issue_is_an_error() {
        let fx = Fixture::new(&["1"]);
        fx.tracking.seed("1", MigrationStatus::Applied, 0);
        fx.write_script("1");
        let report = run_ci(&fx.ctx(), Strictness::Permissive);
        assert_eq!(report.exit_code, EXIT_ERROR);
        assert!(report.errors[0].contains("missing_from_schema"));
    }

    #[test]
    fn medium_issue_is_a_warning() {
        let fx = Fixture::new(&[]);
        fx.schema.insert("5").unwrap();
        let report = run_ci(&fx.ctx(), Strictness::Warning);
        assert_eq!(report.exit_code, EXIT_WARNING);
        assert!(report.warnings[0].contains("orphaned_schema"));
    }

    #[test]
    fn reconciliation_failure_is_an_error() {
        let fx = Fixture::new(&[]);
        fx.vcs.set_failing(true);
        let report = run_ci(&fx.ctx(), Strictness::Warning);
        assert_eq!(report.exit_code, EXIT_ERROR);
        let json: serde_json::Value = serde_json::from_str(&report.render(OutputFormat::Json)).unwrap();
        assert_eq!(json["status"], "error");
    }

    #[test]
    fn parses_cli_values() {
        assert_eq!("strict".parse::<Strictness>().unwrap(), Strictness::Strict);
        assert!(matches!("lenient".parse::<Strictness>(), Err(ParseError::UnknownStrictness(_))));
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
    }
}
