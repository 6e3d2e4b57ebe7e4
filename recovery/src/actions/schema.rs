use migtrack_types::Issue;

use crate::{RecoveryContext, RecoveryError};

/// Forget a schema row nobody tracks. Already-absent rows are fine.
pub(super) fn remove_from_schema(issue: &Issue, ctx: &RecoveryContext<'_>) -> Result<(), RecoveryError> {
    if !ctx.schema.delete(&issue.version)? {
        tracing::info!(version = %issue.version, "version already absent from schema_migrations");
    }
    Ok(())
}
