//! Bootstrap migration that seeds records for an existing population.
//!
//! The runner fans candidates out to a [`PlayerMigrator`] with at most
//! `max_concurrency` calls in flight, bounds each call by the item
//! timeout and the whole run by the global timeout. Item failures are
//! tallied and reported to listeners; they never stop the batch.

mod listener;
mod migrator;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::MigrationConfig;
use crate::{MigrationError, Record};

pub use listener::{DisableOnCompleteListener, LoggingMigrationListener, MigrationListener};
pub use migrator::RepositoryMigrator;

/// A player known to the platform before tracking began.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCandidate {
    pub identity: Uuid,
    #[serde(default)]
    pub last_known_name: Option<String>,
}

impl PlayerCandidate {
    pub fn new(identity: Uuid, last_known_name: Option<String>) -> Self {
        Self {
            identity,
            last_known_name,
        }
    }
}

/// Enumerates every candidate for migration.
pub trait CandidateProvider: Send + Sync {
    fn candidates(&self) -> Vec<PlayerCandidate>;
}

impl CandidateProvider for Vec<PlayerCandidate> {
    fn candidates(&self) -> Vec<PlayerCandidate> {
        self.clone()
    }
}

/// Migrates one candidate into a persisted record.
#[async_trait]
pub trait PlayerMigrator: Send + Sync {
    async fn migrate(&self, candidate: &PlayerCandidate) -> Result<Record, MigrationError>;
}

/// Counts for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl MigrationResult {
    pub fn empty() -> Self {
        Self {
            total: 0,
            successful: 0,
            failed: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// Lifecycle of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MigrationState {
    Idle = 0,
    Running = 1,
    Completed = 2,
    TimedOut = 3,
}

impl From<u8> for MigrationState {
    fn from(v: u8) -> Self {
        match v {
            1 => MigrationState::Running,
            2 => MigrationState::Completed,
            3 => MigrationState::TimedOut,
            _ => MigrationState::Idle,
        }
    }
}

#[derive(Default)]
struct Counters {
    successful: AtomicUsize,
    failed: AtomicUsize,
    in_flight: AtomicUsize,
}

impl Counters {
    fn finished(&self) -> usize {
        self.successful.load(Ordering::SeqCst) + self.failed.load(Ordering::SeqCst)
    }
}

/// Call every listener, logging instead of unwinding when one panics.
fn notify(listeners: &[Arc<dyn MigrationListener>], call: impl Fn(&dyn MigrationListener)) {
    for listener in listeners {
        if catch_unwind(AssertUnwindSafe(|| call(listener.as_ref()))).is_err() {
            warn!("migration listener panicked");
        }
    }
}

/// Bounded-concurrency migration runner.
pub struct MigrationRunner {
    config: MigrationConfig,
    provider: Arc<dyn CandidateProvider>,
    migrator: Arc<dyn PlayerMigrator>,
    listeners: Arc<[Arc<dyn MigrationListener>]>,
    state: AtomicU8,
}

impl MigrationRunner {
    pub fn new(
        config: MigrationConfig,
        provider: Arc<dyn CandidateProvider>,
        migrator: Arc<dyn PlayerMigrator>,
        listeners: Vec<Arc<dyn MigrationListener>>,
    ) -> Self {
        Self {
            config,
            provider,
            migrator,
            listeners: listeners.into(),
            state: AtomicU8::new(MigrationState::Idle as u8),
        }
    }

    pub fn state(&self) -> MigrationState {
        MigrationState::from(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: MigrationState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Run one migration pass.
    ///
    /// Returns [`MigrationResult::empty`] without consulting the provider
    /// when migration is disabled. When the global timeout elapses the
    /// outstanding tasks are aborted and [`MigrationError::GlobalTimeout`]
    /// is returned; `on_end` is not called in that case.
    #[tracing::instrument(skip(self), fields(max_concurrency = self.config.effective_concurrency()))]
    pub async fn execute(&self) -> Result<MigrationResult, MigrationError> {
        if !self.config.enabled {
            debug!("migration disabled, skipping");
            return Ok(MigrationResult::empty());
        }

        let started = Instant::now();
        let deadline = started + self.config.global_timeout;
        self.set_state(MigrationState::Running);

        let candidates = self.provider.candidates();
        let total = candidates.len();
        for listener in self.listeners.iter() {
            listener.on_start(total);
        }

        if total == 0 {
            let result = MigrationResult::empty();
            self.finish(&result);
            return Ok(result);
        }

        let counters = Arc::new(Counters::default());
        counters.in_flight.store(total, Ordering::SeqCst);
        let semaphore = Arc::new(Semaphore::new(self.config.effective_concurrency()));
        let mut tasks = JoinSet::new();

        let run = async {
            for candidate in candidates {
                let permit = Arc::clone(&semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|e| MigrationError::TaskAborted(e.to_string()))?;

                let migrator = Arc::clone(&self.migrator);
                let listeners = Arc::clone(&self.listeners);
                let counters = Arc::clone(&counters);
                let item_timeout = self.config.item_timeout;

                tasks.spawn(async move {
                    let outcome =
                        match tokio::time::timeout(item_timeout, migrator.migrate(&candidate)).await {
                            Ok(result) => result,
                            Err(_) => Err(MigrationError::ItemTimeout(item_timeout.as_millis() as u64)),
                        };
                    drop(permit);

                    // Tallied before listeners run; a panicking listener is
                    // contained so the item is never counted twice
                    match outcome {
                        Ok(_) => {
                            counters.successful.fetch_add(1, Ordering::SeqCst);
                            counters.in_flight.fetch_sub(1, Ordering::SeqCst);
                            notify(&listeners, |l| l.on_success(&candidate));
                        }
                        Err(error) => {
                            counters.failed.fetch_add(1, Ordering::SeqCst);
                            counters.in_flight.fetch_sub(1, Ordering::SeqCst);
                            notify(&listeners, |l| l.on_failed(&candidate, &error));
                        }
                    }
                });
            }

            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    // Migrator panicked before tallying
                    warn!(error = %e, "migration task aborted");
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                    counters.in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            }
            Ok::<(), MigrationError>(())
        };

        let outcome = tokio::time::timeout_at(deadline, run).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tasks.abort_all();
                self.set_state(MigrationState::TimedOut);
                return Err(e);
            }
            Err(_) => {
                tasks.abort_all();
                self.set_state(MigrationState::TimedOut);
                let completed = counters.finished();
                warn!(
                    completed,
                    total,
                    in_flight = counters.in_flight.load(Ordering::SeqCst),
                    "migration exceeded global timeout, aborting outstanding tasks"
                );
                return Err(MigrationError::GlobalTimeout {
                    after_ms: self.config.global_timeout.as_millis() as u64,
                    completed,
                    total,
                });
            }
        }

        let result = MigrationResult {
            total,
            successful: counters.successful.load(Ordering::SeqCst),
            failed: counters.failed.load(Ordering::SeqCst),
            elapsed: started.elapsed(),
        };
        self.finish(&result);
        Ok(result)
    }

    fn finish(&self, result: &MigrationResult) {
        self.set_state(MigrationState::Completed);
        for listener in self.listeners.iter() {
            listener.on_end(result);
        }
        info!(
            total = result.total,
            successful = result.successful,
            failed = result.failed,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "migration finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl MigrationListener for Recorder {
        fn on_start(&self, total: usize) {
            self.events.lock().unwrap().push(format!("start:{total}"));
        }

        fn on_end(&self, result: &MigrationResult) {
            self.events.lock().unwrap().push(format!("end:{}", result.total));
        }
    }

    struct PanicProvider;

    impl CandidateProvider for PanicProvider {
        fn candidates(&self) -> Vec<PlayerCandidate> {
            panic!("provider must not be consulted");
        }
    }

    struct EchoMigrator;

    #[async_trait]
    impl PlayerMigrator for EchoMigrator {
        async fn migrate(&self, candidate: &PlayerCandidate) -> Result<Record, MigrationError> {
            Ok(Record::new(candidate.identity, "Echo")?)
        }
    }

    #[tokio::test]
    async fn test_disabled_returns_empty_without_provider() {
        let runner = MigrationRunner::new(
            MigrationConfig::default().with_enabled(false),
            Arc::new(PanicProvider),
            Arc::new(EchoMigrator),
            Vec::new(),
        );
        assert_eq!(runner.execute().await.unwrap(), MigrationResult::empty());
        assert_eq!(runner.state(), MigrationState::Idle);
    }

    #[tokio::test]
    async fn test_zero_candidates() {
        let recorder = Arc::new(Recorder::default());
        let runner = MigrationRunner::new(
            MigrationConfig::default(),
            Arc::new(Vec::<PlayerCandidate>::new()),
            Arc::new(EchoMigrator),
            vec![recorder.clone() as Arc<dyn MigrationListener>],
        );

        let result = runner.execute().await.unwrap();
        assert_eq!((result.total, result.successful, result.failed), (0, 0, 0));
        assert_eq!(result.elapsed, Duration::ZERO);
        assert_eq!(*recorder.events.lock().unwrap(), vec!["start:0", "end:0"]);
        assert_eq!(runner.state(), MigrationState::Completed);
    }

    #[test]
    fn test_state_from_u8() {
        assert_eq!(MigrationState::from(2), MigrationState::Completed);
        assert_eq!(MigrationState::from(200), MigrationState::Idle);
    }
}
