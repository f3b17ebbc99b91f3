//! Concurrent map with expire-after-write / expire-after-access eviction.
//!
//! Entries are checked lazily on access and eagerly via
//! [`ExpiringMap::purge_expired`]. Removals (other than replacement on
//! insert) are reported to an optional [`EvictionListener`] after the
//! shard lock has been released, so a listener may touch other maps.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::trace;

/// Why an entry left the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Removed by a caller.
    Explicit,
    /// Write or access deadline elapsed.
    Expired,
}

/// Callback invoked with the key and value of a removed entry.
pub type EvictionListener<K, V> = Arc<dyn Fn(&K, &V, RemovalCause) + Send + Sync>;

struct Entry<V> {
    value: V,
    written_at: Instant,
    accessed_at: Instant,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant, after_write: Duration, after_access: Duration) -> bool {
        now.saturating_duration_since(self.written_at) >= after_write
            || now.saturating_duration_since(self.accessed_at) >= after_access
    }
}

/// Thread-safe map whose entries expire after a write or idle deadline,
/// whichever comes first.
pub struct ExpiringMap<K, V> {
    entries: DashMap<K, Entry<V>>,
    expire_after_write: Duration,
    expire_after_access: Duration,
    listener: Option<EvictionListener<K, V>>,
}

impl<K, V> ExpiringMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(expire_after_write: Duration, expire_after_access: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            expire_after_write,
            expire_after_access,
            listener: None,
        }
    }

    /// Attach a listener notified on explicit removal and expiry.
    pub fn with_eviction_listener(mut self, listener: EvictionListener<K, V>) -> Self {
        self.listener = Some(listener);
        self
    }

    fn expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        entry.is_expired(now, self.expire_after_write, self.expire_after_access)
    }

    fn notify(&self, key: &K, value: &V, cause: RemovalCause) {
        if let Some(listener) = &self.listener {
            listener(key, value, cause);
        }
    }

    /// Get a live value and refresh its access deadline.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let mut entry = self.entries.get_mut(key)?;
            if !self.expired(&entry, now) {
                entry.accessed_at = now;
                return Some(entry.value.clone());
            }
        }
        self.evict_if_expired(key, now);
        None
    }

    /// Get a live value without refreshing its access deadline.
    pub fn peek(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if !self.expired(&entry, now) {
                return Some(entry.value.clone());
            }
        }
        self.evict_if_expired(key, now);
        None
    }

    /// Insert or replace, returning the previous live value.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let now = Instant::now();
        let previous = self.entries.insert(
            key,
            Entry {
                value,
                written_at: now,
                accessed_at: now,
            },
        )?;
        if self.expired(&previous, now) {
            None
        } else {
            Some(previous.value)
        }
    }

    /// Remove unconditionally.
    pub fn remove(&self, key: &K) -> Option<V> {
        let (key, entry) = self.entries.remove(key)?;
        self.notify(&key, &entry.value, RemovalCause::Explicit);
        Some(entry.value)
    }

    /// Remove only when `predicate` accepts the current value.
    pub fn remove_if(&self, key: &K, predicate: impl FnOnce(&V) -> bool) -> Option<V> {
        let (key, entry) = self
            .entries
            .remove_if(key, |_, entry| predicate(&entry.value))?;
        self.notify(&key, &entry.value, RemovalCause::Explicit);
        Some(entry.value)
    }

    fn evict_if_expired(&self, key: &K, now: Instant) {
        let removed = self
            .entries
            .remove_if(key, |_, entry| self.expired(entry, now));
        if let Some((key, entry)) = removed {
            trace!("expiring map: entry expired");
            self.notify(&key, &entry.value, RemovalCause::Expired);
        }
    }

    /// Evict every expired entry now. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|e| self.expired(e.value(), now))
            .map(|e| e.key().clone())
            .collect();

        let mut purged = 0;
        for key in expired {
            let removed = self
                .entries
                .remove_if(&key, |_, entry| self.expired(entry, now));
            if let Some((key, entry)) = removed {
                self.notify(&key, &entry.value, RemovalCause::Expired);
                purged += 1;
            }
        }
        purged
    }

    /// Live values, without touching access deadlines.
    pub fn values(&self) -> Vec<V> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| !self.expired(e.value(), now))
            .map(|e| e.value().value.clone())
            .collect()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| !self.expired(e.value(), now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything without notifying the listener.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn map() -> ExpiringMap<&'static str, u32> {
        ExpiringMap::new(Duration::from_secs(60), Duration::from_secs(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_after_access() {
        let map = map();
        map.insert("a", 1);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(map.get(&"a"), Some(1));

        // Access refreshed the idle deadline
        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(map.get(&"a"), Some(1));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(map.get(&"a"), None);
        assert!(map.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_after_write_wins_over_access() {
        let map = map();
        map.insert("a", 1);

        for _ in 0..6 {
            tokio::time::advance(Duration::from_secs(9)).await;
            let _ = map.get(&"a");
        }
        // 54s elapsed, still alive thanks to access
        assert_eq!(map.peek(&"a"), Some(1));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(map.get(&"a"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_peek_does_not_refresh_access() {
        let map = map();
        map.insert("a", 1);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(map.peek(&"a"), Some(1));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(map.peek(&"a"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_sees_expiry_and_explicit_removal() {
        let seen: Arc<Mutex<Vec<(&'static str, u32, RemovalCause)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let map = map().with_eviction_listener(Arc::new(move |k, v, cause| {
            sink.lock().unwrap().push((*k, *v, cause));
        }));

        map.insert("a", 1);
        map.insert("b", 2);
        map.remove(&"b");

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(map.purge_expired(), 1);

        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ("b", 2, RemovalCause::Explicit),
                ("a", 1, RemovalCause::Expired),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_over_expired_returns_none() {
        let map = map();
        map.insert("a", 1);
        assert_eq!(map.insert("a", 2), Some(1));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(map.insert("a", 3), None);
        assert_eq!(map.get(&"a"), Some(3));
    }

    #[test]
    fn test_remove_if_respects_predicate() {
        let map = map();
        map.insert("a", 1);
        assert_eq!(map.remove_if(&"a", |v| *v == 2), None);
        assert_eq!(map.remove_if(&"a", |v| *v == 1), Some(1));
        assert_eq!(map.len(), 0);
    }
}
