use std::fmt::Write;

use migtrack_types::{Issue, IssueKind};

use crate::{RecoveryContext, RecoveryError};

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// SQL and shell steps an operator can review and run by hand.
pub fn manual_sql(issue: &Issue) -> String {
    let v = quote(&issue.version);
    let mut out = format!("-- Manual recovery for {} ({})\n", issue.version, issue.kind);
    let _ = match issue.kind {
        IssueKind::PartialRollback => writeln!(
            out,
            "-- If the down migration finished, forget the schema row:\n\
             DELETE FROM schema_migrations WHERE version = {v};\n\
             -- Otherwise leave the row in place and run the rollback again."
        ),
        IssueKind::OrphanedSchema => writeln!(
            out,
            "-- Nothing tracks this version. If its changes were never applied here:\n\
             DELETE FROM schema_migrations WHERE version = {v};"
        ),
        IssueKind::MissingFromSchema => writeln!(
            out,
            "-- The tracking ledger says applied. After verifying the schema changes exist:\n\
             INSERT INTO schema_migrations (version) VALUES ({v});"
        ),
        IssueKind::MissingFile => writeln!(
            out,
            "-- Find the script in history and restore it:\n\
             --   git log --all --full-history -- '*/{}_*'",
            issue.version
        ),
        IssueKind::VersionConflict => {
            let ids: Vec<String> = issue.migrations.iter().map(|r| r.id.to_string()).collect();
            writeln!(
                out,
                "-- {} tracking records share this version ({}).\n\
                 -- Decide which one reflects the database, then rerun recovery with\n\
                 -- consolidate_records or remove_duplicates.",
                issue.migrations.len(),
                ids.join(", ")
            )
        }
    };
    out
}

/// Advisory only: shows SQL and changes nothing.
pub(super) fn manual_intervention(issue: &Issue, ctx: &RecoveryContext<'_>) -> Result<(), RecoveryError> {
    ctx.operator.show(&manual_sql(issue));
    Ok(())
}
