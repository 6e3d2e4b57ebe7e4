//! LMDB tracking-ledger backend for migtrack.
//!
//! Implements [`TrackingStore`](migtrack_store::TrackingStore) and
//! [`MetaStore`](migtrack_store::MetaStore) using the `heed` LMDB bindings.
//! Records are bincode-encoded and keyed by big-endian record id.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod tracking;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_integrity, IntegrityReport};
pub use meta::LmdbMetaStore;
pub use tracking::LmdbTrackingStore;
