//! Configuration for the cache, service, leaderboard and migration.
//!
//! Every section derives serde with `#[serde(default)]`, so a partial
//! JSON file only overrides the fields it names. Durations are stored as
//! integer milliseconds.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ConfigError;

/// Serialize a [`Duration`] as integer milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Record cache expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(with = "millis")]
    pub expire_after_write: Duration,
    #[serde(with = "millis")]
    pub expire_after_access: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expire_after_write: Duration::from_secs(12 * 60 * 60),
            expire_after_access: Duration::from_secs(2 * 60 * 60),
        }
    }
}

impl CacheConfig {
    pub fn with_expire_after_write(mut self, d: Duration) -> Self {
        self.expire_after_write = d;
        self
    }

    pub fn with_expire_after_access(mut self, d: Duration) -> Self {
        self.expire_after_access = d;
        self
    }
}

/// Record service limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Bound on every repository call made by the service.
    #[serde(with = "millis")]
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(2),
        }
    }
}

impl ServiceConfig {
    pub fn with_request_timeout(mut self, d: Duration) -> Self {
        self.request_timeout = d;
        self
    }
}

/// Leaderboard snapshot settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    /// How long a loaded snapshot is served before a refresh.
    #[serde(with = "millis")]
    pub ttl: Duration,
    /// Rows requested from the repository per refresh.
    pub query_limit: usize,
    #[serde(with = "millis")]
    pub query_timeout: Duration,
    /// Rows shown by default.
    pub display_limit: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
            query_limit: 50,
            query_timeout: Duration::from_secs(3),
            display_limit: 10,
        }
    }
}

impl LeaderboardConfig {
    pub fn with_ttl(mut self, d: Duration) -> Self {
        self.ttl = d;
        self
    }

    pub fn with_query_limit(mut self, limit: usize) -> Self {
        self.query_limit = limit;
        self
    }

    pub fn with_query_timeout(mut self, d: Duration) -> Self {
        self.query_timeout = d;
        self
    }

    pub fn with_display_limit(mut self, limit: usize) -> Self {
        self.display_limit = limit;
        self
    }
}

/// Bootstrap migration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Flipped off after a completed run so the migration runs once.
    pub enabled: bool,
    /// Upper bound on concurrently running migrator calls. Zero is treated as one.
    pub max_concurrency: usize,
    #[serde(with = "millis")]
    pub item_timeout: Duration,
    /// Bound on the whole run, dispatch included.
    #[serde(with = "millis")]
    pub global_timeout: Duration,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrency: 4,
            item_timeout: Duration::from_secs(5),
            global_timeout: Duration::from_secs(2 * 60),
        }
    }
}

impl MigrationConfig {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_item_timeout(mut self, d: Duration) -> Self {
        self.item_timeout = d;
        self
    }

    pub fn with_global_timeout(mut self, d: Duration) -> Self {
        self.global_timeout = d;
        self
    }

    /// Semaphore size actually used by the runner.
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

/// All sections together, as stored in the JSON config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpentTimeConfig {
    pub cache: CacheConfig,
    pub service: ServiceConfig,
    pub leaderboard: LeaderboardConfig,
    pub migration: MigrationConfig,
}

impl SpentTimeConfig {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "config file missing, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = SpentTimeConfig::default();
        assert_eq!(config.cache.expire_after_write, Duration::from_secs(43_200));
        assert_eq!(config.cache.expire_after_access, Duration::from_secs(7_200));
        assert_eq!(config.service.request_timeout, Duration::from_secs(2));
        assert_eq!(config.leaderboard.query_limit, 50);
        assert_eq!(config.leaderboard.display_limit, 10);
        assert!(config.migration.enabled);
        assert_eq!(config.migration.max_concurrency, 4);
        assert_eq!(config.migration.global_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "migration": { "enabled": false, "item_timeout": 250 } }"#;
        let config: SpentTimeConfig = serde_json::from_str(json).unwrap();

        assert!(!config.migration.enabled);
        assert_eq!(config.migration.item_timeout, Duration::from_millis(250));
        assert_eq!(config.migration.max_concurrency, 4);
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_durations_serialize_as_millis() {
        let config = ServiceConfig::default().with_request_timeout(Duration::from_millis(1500));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["request_timeout"], 1500);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let config = MigrationConfig::default().with_max_concurrency(0);
        assert_eq!(config.effective_concurrency(), 1);
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("spenttime.json");

        let missing = SpentTimeConfig::load(&path).unwrap();
        assert_eq!(missing, SpentTimeConfig::default());

        let mut config = SpentTimeConfig::default();
        config.migration.enabled = false;
        config.leaderboard = config.leaderboard.with_display_limit(3);
        config.save(&path).unwrap();

        let loaded = SpentTimeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            SpentTimeConfig::load(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
