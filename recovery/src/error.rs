use migtrack_types::RecordId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("store error: {0}")]
    Store(#[from] migtrack_store::StoreError),

    #[error("vcs error: {0}")]
    Vcs(#[from] migtrack_vcs::VcsError),

    #[error("database error: {0}")]
    Database(#[from] migtrack_database::DatabaseError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no migration script on disk for version {0}")]
    ScriptNotFound(String),

    #[error("cannot restore {version} from history: {detail}")]
    NotInHistory { version: String, detail: String },

    #[error("tracking record {0} no longer exists")]
    RecordVanished(RecordId),

    #[error("{0}")]
    Precondition(String),
}
