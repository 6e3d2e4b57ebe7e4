//! The operator seam: how the executor asks for a choice and shows advice.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use migtrack_types::{Issue, RecoveryAction};

/// The person (or script) driving a recovery.
pub trait Operator: Send + Sync {
    /// Pick one of `choices` for `issue`, or `None` to skip it.
    fn choose(&self, issue: &Issue, choices: &[RecoveryAction]) -> Option<RecoveryAction>;

    /// Show text the operator should read (warnings, SQL to review).
    fn show(&self, message: &str);
}

/// Non-interactive operator: picks the first choice and logs messages.
#[derive(Debug, Default)]
pub struct LogOperator;

impl Operator for LogOperator {
    fn choose(&self, _issue: &Issue, choices: &[RecoveryAction]) -> Option<RecoveryAction> {
        choices.first().copied()
    }

    fn show(&self, message: &str) {
        tracing::info!("{message}");
    }
}

/// Answers from a preset queue and records everything it was shown.
///
/// Useful for scripted runs and tests. When the queue is empty it skips.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: Mutex<VecDeque<Option<RecoveryAction>>>,
    shown: Mutex<Vec<String>>,
    prompts: AtomicUsize,
}

impl ScriptedOperator {
    pub fn new<I>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<RecoveryAction>>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            shown: Mutex::new(Vec::new()),
            prompts: AtomicUsize::new(0),
        }
    }

    /// How many times `choose` was called.
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn shown(&self) -> Vec<String> {
        self.shown
            .lock()
            .map(|shown| shown.clone())
            .unwrap_or_default()
    }
}

impl Operator for ScriptedOperator {
    fn choose(&self, _issue: &Issue, _choices: &[RecoveryAction]) -> Option<RecoveryAction> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .flatten()
    }

    fn show(&self, message: &str) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.push(message.to_string());
        }
    }
}
