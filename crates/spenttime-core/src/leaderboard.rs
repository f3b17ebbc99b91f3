//! Single-slot, TTL-gated leaderboard snapshot.
//!
//! The slot holds at most one immutable snapshot. Readers slice it while
//! it is fresh; once it is older than the TTL the next reader queries the
//! repository and swaps in a new one. Overlapping refreshes are not
//! coalesced: each issues its own query and the last to finish wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::LeaderboardConfig;
use crate::{Record, RecordRepository, ServiceError};

/// Ranked records and when they were loaded.
#[derive(Debug, Clone)]
pub struct LeaderboardSnapshot {
    /// Descending by spent time, identity ascending on ties.
    pub records: Vec<Record>,
    /// Monotonic load time, used for TTL checks.
    pub loaded_at: Instant,
    /// Wall-clock load time, for display.
    pub loaded_at_utc: DateTime<Utc>,
}

impl LeaderboardSnapshot {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            loaded_at: Instant::now(),
            loaded_at_utc: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn is_stale(&self, ttl: std::time::Duration) -> bool {
        Instant::now().saturating_duration_since(self.loaded_at) > ttl
    }
}

/// Leaderboard cache in front of [`RecordRepository::find_top`].
pub struct LeaderboardCache {
    repository: Arc<dyn RecordRepository>,
    config: LeaderboardConfig,
    slot: RwLock<Option<Arc<LeaderboardSnapshot>>>,
}

impl LeaderboardCache {
    pub fn new(repository: Arc<dyn RecordRepository>, config: LeaderboardConfig) -> Self {
        Self {
            repository,
            config,
            slot: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &LeaderboardConfig {
        &self.config
    }

    /// Serve the first `limit` entries, refreshing when missing or stale.
    /// A zero limit is empty and never queries.
    pub async fn get_or_refresh(&self, limit: usize) -> Result<Vec<Record>, ServiceError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let current = self.slot.read().await.clone();
        if let Some(snapshot) = current
            && !snapshot.is_stale(self.config.ttl)
        {
            return Ok(Self::slice(&snapshot, limit));
        }

        let snapshot = self.refresh().await?;
        Ok(Self::slice(&snapshot, limit))
    }

    /// Query the repository and swap in a new snapshot unconditionally.
    #[tracing::instrument(skip(self), fields(query_limit = self.config.query_limit))]
    pub async fn refresh(&self) -> Result<Arc<LeaderboardSnapshot>, ServiceError> {
        let after = self.config.query_timeout;
        let records = match tokio::time::timeout(
            after,
            self.repository.find_top(self.config.query_limit),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_ms = after.as_millis() as u64, "leaderboard query timed out");
                return Err(ServiceError::timeout("leaderboard", after));
            }
        };

        let snapshot = Arc::new(LeaderboardSnapshot::new(records));
        *self.slot.write().await = Some(Arc::clone(&snapshot));
        debug!(entries = snapshot.len(), "leaderboard refreshed");
        Ok(snapshot)
    }

    /// The first `limit` entries of `snapshot`.
    pub fn slice(snapshot: &LeaderboardSnapshot, limit: usize) -> Vec<Record> {
        snapshot.records.iter().take(limit).cloned().collect()
    }

    /// Drop the current snapshot so the next read refreshes.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
        debug!("leaderboard invalidated");
    }

    /// Current snapshot, fresh or not.
    pub async fn snapshot(&self) -> Option<Arc<LeaderboardSnapshot>> {
        self.slot.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use uuid::Uuid;

    use super::*;
    use crate::SpentTime;

    fn snapshot_of(n: usize) -> LeaderboardSnapshot {
        let records = (0..n)
            .map(|i| {
                Record::with_time(
                    Uuid::from_u128(i as u128),
                    format!("p{i}"),
                    SpentTime::from_millis((n - i) as u64),
                )
                .unwrap()
            })
            .collect();
        LeaderboardSnapshot {
            records,
            loaded_at: Instant::now(),
            loaded_at_utc: Utc::now(),
        }
    }

    #[test]
    fn test_slice_edges() {
        let snapshot = snapshot_of(5);
        assert!(LeaderboardCache::slice(&snapshot, 0).is_empty());
        assert_eq!(LeaderboardCache::slice(&snapshot, 3).len(), 3);
        assert_eq!(LeaderboardCache::slice(&snapshot, 5).len(), 5);
        assert_eq!(LeaderboardCache::slice(&snapshot, 50).len(), 5);
        assert!(LeaderboardCache::slice(&snapshot_of(0), 10).is_empty());
    }

    proptest! {
        #[test]
        fn slice_is_prefix_of_snapshot(n in 0usize..40, k in 0usize..60) {
            let snapshot = snapshot_of(n);
            let sliced = LeaderboardCache::slice(&snapshot, k);

            prop_assert_eq!(sliced.len(), k.min(n));
            for (got, want) in sliced.iter().zip(snapshot.records.iter()) {
                prop_assert!(got.same_state(want));
            }
        }
    }
}
