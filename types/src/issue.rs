//! Issues found by the checkers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ParseError, RecoveryAction, TrackingRecord};

/// Category of a detected divergence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A rollback was started and never finished.
    PartialRollback,
    /// The schema ledger holds a version the tracking ledger does not know.
    OrphanedSchema,
    /// Tracked as applied but absent from the schema ledger.
    MissingFromSchema,
    /// Tracked as live but the script is gone from disk.
    MissingFile,
    /// More than one tracking record for the same version.
    VersionConflict,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PartialRollback => "partial_rollback",
            Self::OrphanedSchema => "orphaned_schema",
            Self::MissingFromSchema => "missing_from_schema",
            Self::MissingFile => "missing_file",
            Self::VersionConflict => "version_conflict",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::PartialRollback => Severity::High,
            Self::OrphanedSchema => Severity::Medium,
            Self::MissingFromSchema => Severity::High,
            Self::MissingFile => Severity::Critical,
            Self::VersionConflict => Severity::Critical,
        }
    }

    /// Valid actions for this kind, in default-preference order.
    pub fn recovery_options(&self) -> &'static [RecoveryAction] {
        use RecoveryAction::*;
        match self {
            Self::PartialRollback => &[CompleteRollback, RestoreMigration, MarkAsRolledBack],
            Self::OrphanedSchema => &[TrackMigration, RemoveFromSchema],
            Self::MissingFromSchema => &[ReapplyMigration, MarkAsRolledBack],
            Self::MissingFile => &[
                RestoreFromGit,
                MarkAsRolledBack,
                MarkAsResolved,
                CreatePlaceholder,
            ],
            Self::VersionConflict => &[ConsolidateRecords, RemoveDuplicates],
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Triage ordering only; never drives control flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Critical and high issues fail a CI run.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(ParseError::UnknownSeverity(other.to_string())),
        }
    }
}

/// A divergence between the ledgers, the filesystem and the repository.
///
/// The attached records are a snapshot taken at analysis time. Recovery
/// actions re-read them by id before mutating anything.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub version: String,
    pub migrations: Vec<TrackingRecord>,
    pub description: String,
    pub severity: Severity,
    pub recovery_options: Vec<RecoveryAction>,
}

impl Issue {
    /// Build an issue with the kind's default severity and options.
    pub fn new(
        kind: IssueKind,
        version: impl Into<String>,
        migrations: Vec<TrackingRecord>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            version: version.into(),
            migrations,
            description: description.into(),
            severity: kind.severity(),
            recovery_options: kind.recovery_options().to_vec(),
        }
    }

    /// The single associated record, for kinds that carry one.
    pub fn migration(&self) -> Option<&TrackingRecord> {
        self.migrations.first()
    }

    /// Whether `action` may be run against this issue. Manual intervention
    /// is always allowed.
    pub fn accepts(&self, action: RecoveryAction) -> bool {
        action == RecoveryAction::ManualIntervention || self.recovery_options.contains(&action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_critical_first() {
        let mut v = vec![Severity::Low, Severity::Critical, Severity::Medium, Severity::High];
        v.sort();
        assert_eq!(v, vec![Severity::Critical, Severity::High, Severity::Medium, Severity::Low]);
    }

    #[test]
    fn new_issue_takes_kind_defaults() {
        let issue = Issue::new(IssueKind::MissingFile, "v1", Vec::new(), "gone");
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(issue.recovery_options[0], RecoveryAction::RestoreFromGit);
        assert_eq!(issue.recovery_options.len(), 4);
    }

    #[test]
    fn manual_intervention_is_always_accepted() {
        let issue = Issue::new(IssueKind::OrphanedSchema, "v2", Vec::new(), "");
        assert!(issue.accepts(RecoveryAction::ManualIntervention));
        assert!(issue.accepts(RecoveryAction::RemoveFromSchema));
        assert!(!issue.accepts(RecoveryAction::ConsolidateRecords));
    }

    #[test]
    fn unknown_severity_is_rejected() {
        assert!(matches!(
            "urgent".parse::<Severity>(),
            Err(ParseError::UnknownSeverity(_))
        ));
    }
}
