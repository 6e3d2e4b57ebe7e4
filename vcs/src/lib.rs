//! Version-control collaborator.
//!
//! The reconciliation and recovery logic only sees the [`VcsClient`]
//! trait, which returns typed results. [`GitClient`] implements it by
//! running `git` as a subprocess under a timeout.

pub mod client;
pub mod error;
pub mod git;

pub use client::VcsClient;
pub use error::VcsError;
pub use git::GitClient;
