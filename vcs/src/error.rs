use migtrack_utils::ProcessError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("unexpected output from `{command}`: {detail}")]
    InvalidOutput { command: String, detail: String },
}
