//! Persistent store abstraction.

use std::cmp::Ordering;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::{DeleteResult, Record, RepositoryError};

/// Durable record storage. Writes are last-write-wins.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    async fn find(&self, identity: Uuid) -> Result<Option<Record>, RepositoryError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Record>, RepositoryError>;

    async fn find_all(&self) -> Result<Vec<Record>, RepositoryError>;

    /// Top `limit` records by spent time, descending, ties broken by identity.
    async fn find_top(&self, limit: usize) -> Result<Vec<Record>, RepositoryError>;

    /// Upsert, returning the stored record.
    async fn save(&self, record: Record) -> Result<Record, RepositoryError>;

    async fn delete(&self, identity: Uuid) -> Result<DeleteResult, RepositoryError>;

    async fn delete_by_name(&self, name: &str) -> Result<DeleteResult, RepositoryError>;
}

/// Leaderboard ordering: spent time descending, then identity ascending.
pub fn leaderboard_order(a: &Record, b: &Record) -> Ordering {
    b.spent_time()
        .cmp(&a.spent_time())
        .then_with(|| a.identity().cmp(&b.identity()))
}

/// Repository kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    records: DashMap<Uuid, Record>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated repository.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let repo = Self::new();
        for record in records {
            repo.records.insert(record.identity(), record);
        }
        repo
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn identity_for_name(&self, name: &str) -> Option<Uuid> {
        self.records
            .iter()
            .find(|r| r.display_name() == name)
            .map(|r| *r.key())
    }
}

#[async_trait]
impl RecordRepository for InMemoryRepository {
    async fn find(&self, identity: Uuid) -> Result<Option<Record>, RepositoryError> {
        Ok(self.records.get(&identity).map(|r| r.value().clone()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Record>, RepositoryError> {
        Ok(self
            .identity_for_name(name)
            .and_then(|id| self.records.get(&id).map(|r| r.value().clone())))
    }

    async fn find_all(&self) -> Result<Vec<Record>, RepositoryError> {
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }

    async fn find_top(&self, limit: usize) -> Result<Vec<Record>, RepositoryError> {
        let mut all: Vec<Record> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(leaderboard_order);
        all.truncate(limit);
        Ok(all)
    }

    async fn save(&self, record: Record) -> Result<Record, RepositoryError> {
        self.records.insert(record.identity(), record.clone());
        Ok(record)
    }

    async fn delete(&self, identity: Uuid) -> Result<DeleteResult, RepositoryError> {
        Ok(match self.records.remove(&identity) {
            Some((_, record)) => DeleteResult::deleted(record),
            None => DeleteResult::not_found(),
        })
    }

    async fn delete_by_name(&self, name: &str) -> Result<DeleteResult, RepositoryError> {
        match self.identity_for_name(name) {
            Some(identity) => self.delete(identity).await,
            None => Ok(DeleteResult::not_found()),
        }
    }
}
