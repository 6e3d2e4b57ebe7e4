//! Tracking-ledger layout versioning.
//!
//! The layout version lives in the meta database. Opening an older ledger
//! runs each upgrade step in turn; a ledger written by a newer migtrack is
//! refused rather than guessed at.

use migtrack_store::MetaStore;

use crate::LmdbError;

/// The layout this build reads and writes.
pub const CURRENT_LAYOUT_VERSION: u32 = 1;

pub struct Migrator;

impl Migrator {
    pub fn run(meta: &impl MetaStore) -> Result<(), LmdbError> {
        let found = meta.layout_version()?;
        if found == CURRENT_LAYOUT_VERSION {
            tracing::debug!(version = found, "tracking ledger layout is current");
            return Ok(());
        }
        if found > CURRENT_LAYOUT_VERSION {
            return Err(LmdbError::LayoutTooNew {
                found,
                supported: CURRENT_LAYOUT_VERSION,
            });
        }
        for from in found..CURRENT_LAYOUT_VERSION {
            tracing::info!(from, to = from + 1, "upgrading tracking ledger layout");
            upgrade(from)?;
        }
        meta.set_layout_version(CURRENT_LAYOUT_VERSION)?;
        Ok(())
    }
}

/// Bring the layout from `from` to `from + 1`.
fn upgrade(from: u32) -> Result<(), LmdbError> {
    match from {
        // 0 -> 1: fresh ledger; records are bincode keyed by big-endian id.
        0 => Ok(()),
        _ => Err(LmdbError::UnknownUpgrade(from)),
    }
}
