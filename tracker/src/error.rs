use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("vcs error: {0}")]
    Vcs(#[from] migtrack_vcs::VcsError),

    #[error("no tracking record for version {0}")]
    RecordNotFound(String),

    #[error("rollback of {version} failed: {reason}")]
    RollbackExecution { version: String, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("store error: {0}")]
    Store(#[from] migtrack_store::StoreError),

    #[error("tracking ledger error: {0}")]
    Lmdb(#[from] migtrack_store_lmdb::LmdbError),

    #[error("database error: {0}")]
    Database(#[from] migtrack_database::DatabaseError),

    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] migtrack_reconcile::ReconcileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<migtrack_types::ParseError> for TrackerError {
    fn from(e: migtrack_types::ParseError) -> Self {
        Self::Configuration(e.to_string())
    }
}
