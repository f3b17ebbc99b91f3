//! Shared repository double for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use spenttime_core::{
    DeleteResult, InMemoryRepository, Record, RecordRepository, RepositoryError, SpentTime,
};

/// In-memory repository that can be told to fail or stall, and counts calls.
#[derive(Default)]
pub struct FlakyRepository {
    pub inner: InMemoryRepository,
    fail: AtomicBool,
    reject_deletes: AtomicBool,
    delay_ms: AtomicUsize,
    pub finds: AtomicUsize,
    pub top_queries: AtomicUsize,
    pub saves: AtomicUsize,
}

impl FlakyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Report deletes as `Failed` while keeping the stored row.
    pub fn set_rejecting_deletes(&self, reject: bool) {
        self.reject_deletes.store(reject, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    /// Store directly, bypassing failure injection and counters.
    pub async fn inner_save(&self, record: Record) {
        self.inner
            .save(record)
            .await
            .expect("in-memory save cannot fail");
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> Result<(), RepositoryError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordRepository for FlakyRepository {
    async fn find(&self, identity: Uuid) -> Result<Option<Record>, RepositoryError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        self.inner.find(identity).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Record>, RepositoryError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        self.inner.find_by_name(name).await
    }

    async fn find_all(&self) -> Result<Vec<Record>, RepositoryError> {
        self.gate().await?;
        self.inner.find_all().await
    }

    async fn find_top(&self, limit: usize) -> Result<Vec<Record>, RepositoryError> {
        self.top_queries.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        self.inner.find_top(limit).await
    }

    async fn save(&self, record: Record) -> Result<Record, RepositoryError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        self.inner.save(record).await
    }

    async fn delete(&self, identity: Uuid) -> Result<DeleteResult, RepositoryError> {
        self.gate().await?;
        if self.reject_deletes.load(Ordering::SeqCst) {
            return Ok(DeleteResult::failed(self.inner.find(identity).await?));
        }
        self.inner.delete(identity).await
    }

    async fn delete_by_name(&self, name: &str) -> Result<DeleteResult, RepositoryError> {
        self.gate().await?;
        if self.reject_deletes.load(Ordering::SeqCst) {
            return Ok(DeleteResult::failed(self.inner.find_by_name(name).await?));
        }
        self.inner.delete_by_name(name).await
    }
}

pub fn record(name: &str, millis: u64) -> Record {
    Record::with_time(Uuid::new_v4(), name, SpentTime::from_millis(millis)).unwrap()
}
