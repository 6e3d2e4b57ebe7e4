use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("adapter '{0}' has no schema ledger support; use sqlite or wrap your own client")]
    UnsupportedAdapter(String),

    #[error("invalid migration script {path}: {reason}")]
    InvalidScript { path: String, reason: String },
}

impl From<DatabaseError> for migtrack_store::StoreError {
    fn from(e: DatabaseError) -> Self {
        migtrack_store::StoreError::Backend(e.to_string())
    }
}
