//! Cache-aside record service.
//!
//! Reads check the [`RecordCache`] first and fall back to one bounded
//! repository call. Writes go to the repository first; the cache and the
//! event publisher only see a write after the repository accepted it.
//! A repository call that exceeds the request timeout is dropped, so a
//! late result can never populate the cache.
//!
//! With a [`PlatformTime`] attached the service also keeps the platform's
//! own counter in step: leave and scheduled saves first pull the live
//! time into the record, and every accepted save writes the stored time
//! back (a reset clears the counter instead).

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::record::validate_name;
use crate::{
    DeleteResult, EventPublisher, PlatformTime, Record, RecordCache, RecordEvent, RecordFactory,
    RecordRepository, RepositoryError, SaveReason, ServiceError, SpentTime,
};

/// Orchestrates the cache, the repository and event publication.
pub struct RecordService {
    repository: Arc<dyn RecordRepository>,
    cache: Arc<RecordCache>,
    publisher: Arc<dyn EventPublisher>,
    config: ServiceConfig,
    platform: Option<PlatformTime>,
}

impl RecordService {
    pub fn new(
        repository: Arc<dyn RecordRepository>,
        cache: Arc<RecordCache>,
        publisher: Arc<dyn EventPublisher>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repository,
            cache,
            publisher,
            config,
            platform: None,
        }
    }

    /// Keep the platform's time counter in sync with saved records.
    pub fn with_platform(mut self, platform: PlatformTime) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    /// Run one repository call under the request timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, ServiceError> {
        let after = self.config.request_timeout;
        match tokio::time::timeout(after, call).await {
            Ok(result) => result.map_err(|e| {
                warn!(operation, error = %e, "repository call failed");
                ServiceError::from(e)
            }),
            Err(_) => {
                warn!(operation, timeout_ms = after.as_millis() as u64, "repository call timed out");
                Err(ServiceError::timeout(operation, after))
            }
        }
    }

    pub fn find_cached(&self, identity: Uuid) -> Option<Record> {
        self.cache.get(identity)
    }

    pub fn find_cached_by_name(&self, name: &str) -> Option<Record> {
        self.cache.get_by_name(name)
    }

    /// Every record currently cached.
    pub fn cached_records(&self) -> Vec<Record> {
        self.cache.snapshot()
    }

    /// Cache first, then one bounded repository lookup.
    #[tracing::instrument(skip(self))]
    pub async fn find(&self, identity: Uuid) -> Result<Option<Record>, ServiceError> {
        if let Some(record) = self.cache.get(identity) {
            return Ok(Some(record));
        }

        let found = self.bounded("find", self.repository.find(identity)).await?;
        if let Some(record) = &found {
            debug!("loaded record into cache");
            self.cache.put(record.clone());
        }
        Ok(found)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Record>, ServiceError> {
        validate_name(name.to_string())?;
        if let Some(record) = self.cache.get_by_name(name) {
            return Ok(Some(record));
        }

        let found = self
            .bounded("find_by_name", self.repository.find_by_name(name))
            .await?;
        if let Some(record) = &found {
            debug!(identity = %record.identity(), "loaded record into cache");
            self.cache.put(record.clone());
        }
        Ok(found)
    }

    /// Like [`find`](Self::find) but a miss is [`ServiceError::NotFound`].
    pub async fn require(&self, identity: Uuid) -> Result<Record, ServiceError> {
        self.find(identity)
            .await?
            .ok_or_else(|| ServiceError::NotFound(identity.to_string()))
    }

    pub async fn require_by_name(&self, name: &str) -> Result<Record, ServiceError> {
        self.find_by_name(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(name.to_string()))
    }

    /// Persist, then cache and publish. Nothing changes on failure.
    ///
    /// Leave and scheduled saves take their time from the platform first.
    #[tracing::instrument(skip(self, record), fields(identity = %record.identity()))]
    pub async fn save(&self, mut record: Record, reason: SaveReason) -> Result<Record, ServiceError> {
        if let Some(platform) = &self.platform
            && matches!(reason, SaveReason::PlayerLeave | SaveReason::ScheduledSave)
        {
            record.set_spent_time(platform.get(record.identity()).await?);
        }

        let saved = self.bounded("save", self.repository.save(record)).await?;

        self.cache.put(saved.clone());
        self.sync_platform(&saved, reason).await;
        self.publisher.publish(RecordEvent::Saved {
            record: saved.clone(),
            reason,
        });
        debug!(millis = saved.spent_time().as_millis(), "record saved");
        Ok(saved)
    }

    /// Write an accepted save back to the platform counter.
    async fn sync_platform(&self, saved: &Record, reason: SaveReason) {
        let Some(platform) = &self.platform else {
            return;
        };
        let identity = saved.identity();
        let synced = if reason == SaveReason::ResetCommand && saved.spent_time().is_zero() {
            platform.reset(identity).await
        } else {
            platform.set(identity, saved.spent_time()).await
        };
        // The repository already holds the write; a stale counter is only logged
        if let Err(e) = synced {
            warn!(%identity, error = %e, "failed to sync platform time");
        }
    }

    /// Load or create the record for a player who just connected.
    ///
    /// A new player is seeded from the platform counter (zero without a
    /// platform). An existing record is saved again only when the name
    /// changed.
    #[tracing::instrument(skip(self))]
    pub async fn join(&self, identity: Uuid, name: &str) -> Result<Record, ServiceError> {
        validate_name(name.to_string())?;
        match self.find(identity).await? {
            Some(mut record) => {
                if record.display_name() == name {
                    return Ok(record);
                }
                record.set_display_name(name)?;
                self.save(record, SaveReason::PlayerJoin).await
            }
            None => {
                let record = match &self.platform {
                    Some(platform) => {
                        RecordFactory::new(platform.clone())
                            .create(identity, Some(name))
                            .await?
                    }
                    None => Record::new(identity, name)?,
                };
                info!("new player record");
                self.save(record, SaveReason::PlayerJoin).await
            }
        }
    }

    /// Save a disconnecting player's cached record. Uncached players are
    /// skipped.
    #[tracing::instrument(skip(self))]
    pub async fn leave(&self, identity: Uuid) -> Result<Option<Record>, ServiceError> {
        match self.cache.get(identity) {
            Some(record) => self.save(record, SaveReason::PlayerLeave).await.map(Some),
            None => Ok(None),
        }
    }

    /// Save every cached record with its live platform time.
    ///
    /// Returns how many saves succeeded. Failures are logged and skipped.
    #[tracing::instrument(skip(self))]
    pub async fn save_cached(&self) -> usize {
        let records = self.cache.snapshot();
        let total = records.len();
        let mut saved = 0;
        for record in records {
            let identity = record.identity();
            match self.save(record, SaveReason::ScheduledSave).await {
                Ok(_) => saved += 1,
                Err(e) => warn!(%identity, error = %e, "scheduled save failed"),
            }
        }
        debug!(saved, total, "scheduled save finished");
        saved
    }

    /// Zero one record and clear its platform counter.
    pub async fn reset(&self, mut record: Record) -> Result<Record, ServiceError> {
        record.set_spent_time(SpentTime::ZERO);
        self.save(record, SaveReason::ResetCommand).await
    }

    /// Delete by identity. The result is published whatever its status.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, identity: Uuid) -> Result<DeleteResult, ServiceError> {
        let result = self.bounded("delete", self.repository.delete(identity)).await?;

        if result.is_success() {
            self.cache.invalidate(identity);
        }
        debug!(status = ?result.status, "delete finished");
        self.publisher.publish(RecordEvent::Deleted(result.clone()));
        Ok(result)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_by_name(&self, name: &str) -> Result<DeleteResult, ServiceError> {
        validate_name(name.to_string())?;
        let result = self
            .bounded("delete_by_name", self.repository.delete_by_name(name))
            .await?;

        if result.is_success()
            && let Some(record) = &result.record
        {
            self.cache.invalidate(record.identity());
        }
        debug!(status = ?result.status, "delete finished");
        self.publisher.publish(RecordEvent::Deleted(result.clone()));
        Ok(result)
    }

    /// Top `limit` records straight from the repository.
    pub async fn top(&self, limit: usize) -> Result<Vec<Record>, ServiceError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.bounded("find_top", self.repository.find_top(limit)).await
    }

    /// Zero every stored record, saving each through the service.
    ///
    /// Returns how many records were reset. Individual save failures are
    /// logged and skipped.
    #[tracing::instrument(skip(self))]
    pub async fn reset_all(&self) -> Result<usize, ServiceError> {
        let records = self.bounded("find_all", self.repository.find_all()).await?;
        let total = records.len();

        let mut reset = 0;
        for record in records {
            let identity = record.identity();
            match self.reset(record).await {
                Ok(_) => reset += 1,
                Err(e) => warn!(%identity, error = %e, "failed to reset record"),
            }
        }

        info!(reset, total, "reset all records");
        Ok(reset)
    }
}
