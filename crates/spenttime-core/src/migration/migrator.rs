use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use super::{PlayerCandidate, PlayerMigrator};
use crate::{MigrationError, Record, RecordFactory, RecordRepository, ServiceError};

/// Seeds a record from platform time and saves it to the repository.
pub struct RepositoryMigrator {
    repository: Arc<dyn RecordRepository>,
    factory: RecordFactory,
}

impl RepositoryMigrator {
    pub fn new(repository: Arc<dyn RecordRepository>, factory: RecordFactory) -> Self {
        Self {
            repository,
            factory,
        }
    }
}

#[async_trait]
impl PlayerMigrator for RepositoryMigrator {
    async fn migrate(&self, candidate: &PlayerCandidate) -> Result<Record, MigrationError> {
        let record = self
            .factory
            .create(candidate.identity, candidate.last_known_name.as_deref())
            .await
            .map_err(|e| match e {
                ServiceError::Repository(e) => MigrationError::Repository(e),
                other => MigrationError::Migrator(other.to_string()),
            })?;

        let saved = self.repository.save(record).await?;
        trace!(identity = %saved.identity(), "migrated player");
        Ok(saved)
    }
}
