//! One forward or backward migration run, start to finish.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use migtrack_types::Timestamp;

struct NotInTrunk {
    version: String,
    branch: Option<String>,
}

/// Counts migrations run in one invocation and holds back "not in trunk"
/// warnings until [`close`](BatchSession::close).
///
/// Created at the start of a run and passed to every tracked migration.
/// It only affects how warnings are grouped.
pub struct BatchSession {
    trunk: String,
    started_at: Timestamp,
    runs: AtomicUsize,
    deferred: Mutex<Vec<NotInTrunk>>,
}

impl BatchSession {
    pub fn start(trunk: &str, now: Timestamp) -> Self {
        Self {
            trunk: trunk.to_string(),
            started_at: now,
            runs: AtomicUsize::new(0),
            deferred: Mutex::new(Vec::new()),
        }
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn record_run(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
    }

    pub fn defer_not_in_trunk(&self, version: &str, branch: Option<&str>) {
        if let Ok(mut deferred) = self.deferred.lock() {
            deferred.push(NotInTrunk {
                version: version.to_string(),
                branch: branch.map(String::from),
            });
        }
    }

    /// End the run. Returns one consolidated warning when more than one
    /// migration ran, otherwise one warning per deferred migration.
    pub fn close(self) -> Vec<String> {
        let runs = self.runs();
        let deferred = self.deferred.into_inner().unwrap_or_default();
        if deferred.is_empty() {
            return Vec::new();
        }
        let describe = |entry: &NotInTrunk| match &entry.branch {
            Some(branch) => format!("{} (from {branch})", entry.version),
            None => entry.version.clone(),
        };

        let warnings = if runs > 1 {
            let listed: Vec<String> = deferred.iter().map(describe).collect();
            vec![format!(
                "{} of {runs} migrations in this run are not in {}: {}",
                deferred.len(),
                self.trunk,
                listed.join(", ")
            )]
        } else {
            deferred
                .iter()
                .map(|entry| format!("Migration {} is not in {}", describe(entry), self.trunk))
                .collect()
        };
        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        warnings
    }
}
