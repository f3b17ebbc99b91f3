use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tracing::{info, warn};

use super::{MigrationResult, PlayerCandidate};
use crate::MigrationError;

/// Percent step between progress log lines.
const PROGRESS_STEP_PERCENT: usize = 5;

/// Observer of a migration run. Every hook defaults to a no-op.
///
/// `on_success` and `on_failed` are called from worker tasks and may run
/// concurrently with each other.
pub trait MigrationListener: Send + Sync {
    fn on_start(&self, _total: usize) {}

    fn on_success(&self, _candidate: &PlayerCandidate) {}

    fn on_failed(&self, _candidate: &PlayerCandidate, _error: &MigrationError) {}

    fn on_end(&self, _result: &MigrationResult) {}
}

/// Logs start, failures, progress every 5% and the final tally.
#[derive(Debug, Default)]
pub struct LoggingMigrationListener {
    total: AtomicUsize,
    completed: AtomicUsize,
    last_step: AtomicUsize,
}

impl LoggingMigrationListener {
    pub fn new() -> Self {
        Self::default()
    }

    fn advance(&self) {
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.total.load(Ordering::SeqCst).max(1);
        let percent = done * 100 / total;
        let step = percent / PROGRESS_STEP_PERCENT;

        let previous = self.last_step.fetch_max(step, Ordering::SeqCst);
        if step > previous || done == total {
            info!(percent, done, total, "migration progress");
        }
    }
}

impl MigrationListener for LoggingMigrationListener {
    fn on_start(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        self.last_step.store(0, Ordering::SeqCst);
        info!(total, "starting first-time migration");
    }

    fn on_success(&self, _candidate: &PlayerCandidate) {
        self.advance();
    }

    fn on_failed(&self, candidate: &PlayerCandidate, error: &MigrationError) {
        warn!(identity = %candidate.identity, error = %error, "migration failed for player");
        self.advance();
    }

    fn on_end(&self, result: &MigrationResult) {
        info!(
            successful = result.successful,
            failed = result.failed,
            took_ms = result.elapsed.as_millis() as u64,
            "migration ended"
        );
    }
}

/// Turns a shared `enabled` flag off once a run completes, so the
/// bootstrap migration only happens once. The owner persists the flag.
#[derive(Debug, Clone)]
pub struct DisableOnCompleteListener {
    enabled: Arc<AtomicBool>,
}

impl DisableOnCompleteListener {
    pub fn new(enabled: Arc<AtomicBool>) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl MigrationListener for DisableOnCompleteListener {
    fn on_end(&self, _result: &MigrationResult) {
        self.enabled.store(false, Ordering::SeqCst);
    }
}
