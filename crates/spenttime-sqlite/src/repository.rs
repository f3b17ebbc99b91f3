use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use spenttime_core::{DeleteResult, Record, RecordRepository, RepositoryError};

use crate::{RecordDb, SqliteRepositoryError};

/// [`RecordRepository`] over [`RecordDb`]. Each call runs on tokio's
/// blocking pool so the connection mutex never stalls a runtime worker.
#[derive(Clone)]
pub struct SqliteRepository {
    db: Arc<RecordDb>,
}

impl SqliteRepository {
    pub fn open(path: &Path) -> Result<Self, SqliteRepositoryError> {
        Ok(Self::new(RecordDb::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, SqliteRepositoryError> {
        Ok(Self::new(RecordDb::open_in_memory()?))
    }

    pub fn new(db: RecordDb) -> Self {
        Self { db: Arc::new(db) }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&RecordDb) -> Result<T, SqliteRepositoryError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| SqliteRepositoryError::Join(e.to_string()))?
            .map_err(RepositoryError::from)
    }
}

#[async_trait]
impl RecordRepository for SqliteRepository {
    async fn find(&self, identity: Uuid) -> Result<Option<Record>, RepositoryError> {
        self.blocking(move |db| db.find(identity)).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Record>, RepositoryError> {
        let name = name.to_string();
        self.blocking(move |db| db.find_by_name(&name)).await
    }

    async fn find_all(&self) -> Result<Vec<Record>, RepositoryError> {
        self.blocking(|db| db.find_all()).await
    }

    async fn find_top(&self, limit: usize) -> Result<Vec<Record>, RepositoryError> {
        self.blocking(move |db| db.find_top(limit)).await
    }

    async fn save(&self, record: Record) -> Result<Record, RepositoryError> {
        self.blocking(move |db| db.upsert(&record).map(|()| record))
            .await
    }

    async fn delete(&self, identity: Uuid) -> Result<DeleteResult, RepositoryError> {
        self.blocking(move |db| db.delete(identity)).await
    }

    async fn delete_by_name(&self, name: &str) -> Result<DeleteResult, RepositoryError> {
        let name = name.to_string();
        self.blocking(move |db| db.delete_by_name(&name)).await
    }
}
