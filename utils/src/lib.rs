//! Shared utilities for migtrack.

pub mod logging;
pub mod process;
pub mod time;

pub use logging::{init_logging, LogFormat};
pub use process::{run_with_timeout, ProcessError, ProcessOutput};
pub use time::format_duration;
