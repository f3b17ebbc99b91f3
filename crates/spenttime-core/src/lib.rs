//! Spent-time tracking core.
//!
//! This crate provides the concurrency-sensitive layer behind spenttime:
//!
//! - **Record cache**: dual-indexed (identity and display name) in-memory
//!   store with write/access expiry and cascading name invalidation
//! - **Record service**: cache-aside orchestrator in front of a
//!   [`RecordRepository`], publishing [`RecordEvent`]s on writes
//! - **Leaderboard**: single-slot, TTL-gated snapshot of the top records
//! - **Migration**: bounded-concurrency bootstrap migration with per-item
//!   and whole-run timeouts

pub mod cache;
pub mod config;
mod error;
pub mod events;
mod expiry;
pub mod format;
pub mod leaderboard;
pub mod migration;
pub mod platform;
mod record;
pub mod repository;
pub mod service;

pub use cache::RecordCache;
pub use config::{CacheConfig, LeaderboardConfig, MigrationConfig, ServiceConfig, SpentTimeConfig};
pub use error::{ConfigError, MigrationError, RecordError, RepositoryError, ServiceError};
pub use events::{BroadcastPublisher, EventPublisher, NoopPublisher, RecordEvent};
pub use expiry::{EvictionListener, ExpiringMap, RemovalCause};
pub use format::{DurationStyle, ParseDurationError, parse_duration};
pub use leaderboard::{LeaderboardCache, LeaderboardSnapshot};
pub use migration::{
    CandidateProvider, DisableOnCompleteListener, LoggingMigrationListener, MigrationListener,
    MigrationResult, MigrationRunner, MigrationState, PlayerCandidate, PlayerMigrator,
    RepositoryMigrator,
};
pub use platform::{
    InlineScheduler, MemoryTimeSource, PlatformTime, PlatformTimeSource, RecordFactory, Scheduler,
};
pub use record::{DeleteResult, DeleteStatus, Record, SaveReason, SpentTime};
pub use repository::{InMemoryRepository, RecordRepository};
pub use service::RecordService;
