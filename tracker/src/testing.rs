//! Nullable-backed context for unit tests.

use migtrack_database::MigrationScripts;
use migtrack_nullables::{NullClock, NullSchemaLedger, NullScriptRunner, NullTrackingStore, NullVcs};
use migtrack_store::SchemaLedger;
use migtrack_types::MigrationStatus;

use crate::{TrackerConfig, TrackerContext};

pub const NOW: u64 = 1_700_000_000;

pub struct Fixture {
    pub config: TrackerConfig,
    pub tracking: NullTrackingStore,
    pub schema: NullSchemaLedger,
    pub runner: NullScriptRunner,
    pub vcs: NullVcs,
    pub scripts: MigrationScripts,
    pub clock: NullClock,
    pub dir: tempfile::TempDir,
}

impl Fixture {
    /// On branch `feature/x`, with `trunk` as the versions in `main`.
    pub fn new(trunk: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = TrackerConfig {
            repo_root: dir.path().to_path_buf(),
            ..Default::default()
        };
        Self {
            scripts: MigrationScripts::new(config.migrations_path()),
            config,
            tracking: NullTrackingStore::new(),
            schema: NullSchemaLedger::new(),
            runner: NullScriptRunner::new(),
            vcs: NullVcs::new("feature/x").with_branch("main", trunk.iter().copied()),
            clock: NullClock::new(NOW),
            dir,
        }
    }

    pub fn ctx(&self) -> TrackerContext<'_> {
        TrackerContext {
            config: &self.config,
            tracking: &self.tracking,
            schema: &self.schema,
            runner: &self.runner,
            vcs: &self.vcs,
            scripts: &self.scripts,
            clock: &self.clock,
        }
    }

    pub fn write_script(&self, version: &str) {
        self.scripts
            .write_script(
                &format!("{version}_m.sql"),
                b"-- migrate:up\nSELECT 1;\n-- migrate:down\nSELECT 2;\n",
            )
            .unwrap();
    }

    /// Applied in both ledgers with a script on disk.
    pub fn applied_with_script(&self, version: &str) {
        self.tracking.seed(version, MigrationStatus::Applied, 0);
        self.schema.insert(version).unwrap();
        self.write_script(version);
    }
}
