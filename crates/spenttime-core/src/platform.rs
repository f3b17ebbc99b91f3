//! Access to the platform's own time statistics.
//!
//! The platform source may only be touched from its designated thread, so
//! every call goes through a [`Scheduler`]. [`PlatformTime`] hides the hop
//! behind async methods and hands results back over a oneshot channel.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use crate::{Record, ServiceError, SpentTime};

/// Placeholder used when a candidate has no known name.
const UNKNOWN_NAME_PREFIX: &str = "Unknown:";

/// The platform's authoritative per-player time statistic.
pub trait PlatformTimeSource: Send + Sync {
    fn get_time(&self, identity: Uuid) -> SpentTime;
    fn set_time(&self, identity: Uuid, time: SpentTime);
    fn reset_time(&self, identity: Uuid);
}

/// Runs a job on the platform's designated thread.
pub trait Scheduler: Send + Sync {
    fn run_sync(&self, job: Box<dyn FnOnce() + Send + 'static>);
}

/// Runs jobs on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn run_sync(&self, job: Box<dyn FnOnce() + Send + 'static>) {
        job();
    }
}

/// In-memory time source for tests and the CLI.
#[derive(Debug, Default)]
pub struct MemoryTimeSource {
    times: DashMap<Uuid, SpentTime>,
}

impl MemoryTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlatformTimeSource for MemoryTimeSource {
    fn get_time(&self, identity: Uuid) -> SpentTime {
        self.times.get(&identity).map(|t| *t).unwrap_or_default()
    }

    fn set_time(&self, identity: Uuid, time: SpentTime) {
        self.times.insert(identity, time);
    }

    fn reset_time(&self, identity: Uuid) {
        self.times.remove(&identity);
    }
}

/// Async facade over a [`PlatformTimeSource`] and its [`Scheduler`].
#[derive(Clone)]
pub struct PlatformTime {
    source: Arc<dyn PlatformTimeSource>,
    scheduler: Arc<dyn Scheduler>,
}

impl PlatformTime {
    pub fn new(source: Arc<dyn PlatformTimeSource>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self { source, scheduler }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn PlatformTimeSource) -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let source = Arc::clone(&self.source);
        self.scheduler.run_sync(Box::new(move || {
            let _ = tx.send(f(source.as_ref()));
        }));
        rx.await
            .map_err(|_| ServiceError::InvalidState("platform scheduler dropped job".to_string()))
    }

    pub async fn get(&self, identity: Uuid) -> Result<SpentTime, ServiceError> {
        self.run(move |source| source.get_time(identity)).await
    }

    pub async fn set(&self, identity: Uuid, time: SpentTime) -> Result<(), ServiceError> {
        self.run(move |source| source.set_time(identity, time)).await
    }

    pub async fn reset(&self, identity: Uuid) -> Result<(), ServiceError> {
        self.run(move |source| source.reset_time(identity)).await
    }
}

/// Builds fresh records seeded from the platform time source.
#[derive(Clone)]
pub struct RecordFactory {
    time: PlatformTime,
}

impl RecordFactory {
    pub fn new(time: PlatformTime) -> Self {
        Self { time }
    }

    /// Create a record for `identity`. Missing or blank names become
    /// `Unknown:<identity>`.
    pub async fn create(&self, identity: Uuid, name: Option<&str>) -> Result<Record, ServiceError> {
        let name = match name {
            Some(n) if !n.trim().is_empty() => n.to_string(),
            _ => format!("{UNKNOWN_NAME_PREFIX}{identity}"),
        };
        let time = self.time.get(identity).await?;
        debug!(%identity, name = %name, millis = time.as_millis(), "record created from platform time");
        Ok(Record::with_time(identity, name, time)?)
    }
}
