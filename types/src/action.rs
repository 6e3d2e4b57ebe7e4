//! Recovery action identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ParseError;

/// Every recovery action the executor knows how to dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    CompleteRollback,
    RestoreMigration,
    MarkAsRolledBack,
    TrackMigration,
    RemoveFromSchema,
    ReapplyMigration,
    RestoreFromGit,
    MarkAsResolved,
    CreatePlaceholder,
    ConsolidateRecords,
    RemoveDuplicates,
    ManualIntervention,
}

impl RecoveryAction {
    pub const ALL: [RecoveryAction; 12] = [
        Self::CompleteRollback,
        Self::RestoreMigration,
        Self::MarkAsRolledBack,
        Self::TrackMigration,
        Self::RemoveFromSchema,
        Self::ReapplyMigration,
        Self::RestoreFromGit,
        Self::MarkAsResolved,
        Self::CreatePlaceholder,
        Self::ConsolidateRecords,
        Self::RemoveDuplicates,
        Self::ManualIntervention,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompleteRollback => "complete_rollback",
            Self::RestoreMigration => "restore_migration",
            Self::MarkAsRolledBack => "mark_as_rolled_back",
            Self::TrackMigration => "track_migration",
            Self::RemoveFromSchema => "remove_from_schema",
            Self::ReapplyMigration => "reapply_migration",
            Self::RestoreFromGit => "restore_from_git",
            Self::MarkAsResolved => "mark_as_resolved",
            Self::CreatePlaceholder => "create_placeholder",
            Self::ConsolidateRecords => "consolidate_records",
            Self::RemoveDuplicates => "remove_duplicates",
            Self::ManualIntervention => "manual_intervention",
        }
    }

    /// Short operator-facing label for menus.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CompleteRollback => "Complete the interrupted rollback",
            Self::RestoreMigration => "Restore the migration to applied",
            Self::MarkAsRolledBack => "Mark as rolled back (no verification)",
            Self::TrackMigration => "Add a tracking record for it",
            Self::RemoveFromSchema => "Remove it from the schema ledger",
            Self::ReapplyMigration => "Re-run the migration forward",
            Self::RestoreFromGit => "Restore the script from git history",
            Self::MarkAsResolved => "Mark as resolved",
            Self::CreatePlaceholder => "Create a placeholder script",
            Self::ConsolidateRecords => "Consolidate duplicate records into one",
            Self::RemoveDuplicates => "Delete duplicate records",
            Self::ManualIntervention => "Show SQL for manual intervention",
        }
    }

    /// Whether running this action changes any ledger or file.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::ManualIntervention)
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecoveryAction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ParseError::UnknownAction(s.to_string()))
    }
}
