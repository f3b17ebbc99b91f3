//! Wiring of the core components over the SQLite repository.

use std::path::Path;
use std::sync::Arc;

use miette::Result;
use tracing::debug;
use uuid::Uuid;

use spenttime_core::{
    LeaderboardCache, NoopPublisher, Record, RecordCache, RecordRepository, RecordService,
    SpentTimeConfig,
};
use spenttime_sqlite::SqliteRepository;

pub struct App {
    pub config: SpentTimeConfig,
    pub repository: Arc<dyn RecordRepository>,
    pub service: RecordService,
    pub leaderboard: LeaderboardCache,
}

impl App {
    pub fn open(db: &Path, config_path: &Path) -> Result<Self> {
        let config = SpentTimeConfig::load(config_path).map_err(|e| miette::miette!("{}", e))?;
        let repository: Arc<dyn RecordRepository> =
            Arc::new(SqliteRepository::open(db).map_err(|e| miette::miette!("{}", e))?);
        debug!(db = %db.display(), "opened record store");
        Ok(Self::with_repository(config, repository))
    }

    pub fn with_repository(config: SpentTimeConfig, repository: Arc<dyn RecordRepository>) -> Self {
        let service = RecordService::new(
            Arc::clone(&repository),
            Arc::new(RecordCache::new(&config.cache)),
            Arc::new(NoopPublisher),
            config.service.clone(),
        );
        let leaderboard = LeaderboardCache::new(Arc::clone(&repository), config.leaderboard.clone());
        Self {
            config,
            repository,
            service,
            leaderboard,
        }
    }

    /// Resolve a UUID or display name to a stored record.
    pub async fn resolve(&self, player: &str) -> Result<Record> {
        let found = match Uuid::parse_str(player) {
            Ok(identity) => self.service.require(identity).await,
            Err(_) => self.service.require_by_name(player).await,
        };
        found.map_err(|e| miette::miette!("{}", e))
    }
}
