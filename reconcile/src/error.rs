use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("vcs error: {0}")]
    Vcs(#[from] migtrack_vcs::VcsError),

    #[error("store error: {0}")]
    Store(#[from] migtrack_store::StoreError),
}
