//! Dual-indexed in-memory record cache.
//!
//! Records are indexed by identity (primary) and by display name
//! (secondary, name -> identity). The primary index expires entries after
//! a write or idle deadline and carries an eviction listener that drops
//! the matching name entry, so an expired or removed record never leaves
//! an orphaned name behind. The name index only has the write deadline:
//! its idle lifetime follows the record it points at, whichever key the
//! record is read through.
//!
//! The two indices are updated one after the other, not atomically. A
//! reader racing a rename may briefly see the old name still resolve, or
//! the new name not yet resolve. Name lookups verify the resolved record
//! still carries the requested name and drop the stale entry otherwise,
//! so the window closes on the next lookup.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::expiry::{ExpiringMap, RemovalCause};
use crate::Record;

/// Thread-safe record cache indexed by identity and display name.
pub struct RecordCache {
    by_identity: ExpiringMap<Uuid, Record>,
    by_name: Arc<ExpiringMap<String, Uuid>>,
}

impl RecordCache {
    /// Create a cache with the given expiry configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let by_name = Arc::new(ExpiringMap::new(config.expire_after_write, Duration::MAX));

        let names = Arc::clone(&by_name);
        let by_identity =
            ExpiringMap::new(config.expire_after_write, config.expire_after_access)
                .with_eviction_listener(Arc::new(
                    move |identity: &Uuid, record: &Record, cause: RemovalCause| {
                        // Only drop the name if it still points at this record
                        names.remove_if(&record.display_name().to_string(), |id| id == identity);
                        trace!(%identity, ?cause, "cache: record evicted");
                    },
                ));

        Self {
            by_identity,
            by_name,
        }
    }

    /// Look up by identity. Never touches the repository.
    pub fn get(&self, identity: Uuid) -> Option<Record> {
        self.by_identity.get(&identity)
    }

    /// Look up by display name. Never touches the repository.
    pub fn get_by_name(&self, name: &str) -> Option<Record> {
        let key = name.to_string();
        let identity = self.by_name.get(&key)?;

        match self.by_identity.get(&identity) {
            Some(record) if record.display_name() == name => Some(record),
            _ => {
                // Stale secondary entry: record renamed, evicted or replaced
                self.by_name.remove_if(&key, |id| *id == identity);
                trace!(name, %identity, "cache: dropped stale name entry");
                None
            }
        }
    }

    /// Insert or replace a record, moving its name entry on rename.
    pub fn put(&self, record: Record) {
        let identity = record.identity();
        let name = record.display_name().to_string();

        let previous = self.by_identity.insert(identity, record);
        if let Some(previous) = previous
            && previous.display_name() != name
        {
            self.by_name
                .remove_if(&previous.display_name().to_string(), |id| *id == identity);
            debug!(%identity, old = previous.display_name(), new = %name, "cache: record renamed");
        }

        self.by_name.insert(name, identity);
    }

    /// Remove by identity from both indices.
    pub fn invalidate(&self, identity: Uuid) {
        // Eviction listener removes the name entry
        self.by_identity.remove(&identity);
    }

    /// Remove by display name from both indices.
    pub fn invalidate_by_name(&self, name: &str) {
        let key = name.to_string();
        match self.by_name.peek(&key) {
            Some(identity) => {
                self.by_identity
                    .remove_if(&identity, |record| record.display_name() == name);
                self.by_name.remove_if(&key, |id| *id == identity);
            }
            None => {
                self.by_name.remove(&key);
            }
        }
    }

    /// Point-in-time copy of every live record.
    pub fn snapshot(&self) -> Vec<Record> {
        self.by_identity.values()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.by_identity.clear();
        self.by_name.clear();
    }

    /// Evict expired entries now, cascading to the name index.
    pub fn purge_expired(&self) -> usize {
        let purged = self.by_identity.purge_expired();
        self.by_name.purge_expired();
        if purged > 0 {
            debug!(purged, "cache: purged expired records");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
