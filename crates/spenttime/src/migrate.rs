//! Bootstrap migration command.
//!
//! The population file stands in for the platform: it lists every known
//! player with the time the platform already recorded for them. After a
//! completed run the `migration.enabled` flag is switched off and saved
//! back to the config file, so later invocations are no-ops.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use miette::Result;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use spenttime_core::{
    DisableOnCompleteListener, InlineScheduler, LoggingMigrationListener, MemoryTimeSource,
    MigrationListener, MigrationRunner, PlatformTime, PlatformTimeSource, PlayerCandidate,
    RecordFactory, RepositoryMigrator, SpentTime,
};

use crate::app::App;

/// One player in the population file.
#[derive(Debug, Deserialize)]
pub struct PopulationEntry {
    pub identity: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub spent_millis: u64,
}

/// Parse the population file into candidates and a seeded time source.
pub fn load_population(raw: &str) -> Result<(Vec<PlayerCandidate>, MemoryTimeSource)> {
    let entries: Vec<PopulationEntry> =
        serde_json::from_str(raw).map_err(|e| miette::miette!("invalid population file: {}", e))?;

    let source = MemoryTimeSource::new();
    let candidates = entries
        .into_iter()
        .map(|entry| {
            source.set_time(entry.identity, SpentTime::from_millis(entry.spent_millis));
            PlayerCandidate::new(entry.identity, entry.name)
        })
        .collect();
    Ok((candidates, source))
}

pub async fn run(db: &Path, config_path: &Path, population: &Path, force: bool) -> Result<()> {
    let mut app = App::open(db, config_path)?;
    if force {
        app.config.migration.enabled = true;
    }
    if !app.config.migration.enabled {
        info!("migration already completed, pass --force to run again");
        return Ok(());
    }

    let raw = std::fs::read_to_string(population)
        .map_err(|e| miette::miette!("failed to read {}: {}", population.display(), e))?;
    let (candidates, source) = load_population(&raw)?;

    let platform = PlatformTime::new(Arc::new(source), Arc::new(InlineScheduler));
    let migrator = RepositoryMigrator::new(Arc::clone(&app.repository), RecordFactory::new(platform));

    let enabled = Arc::new(AtomicBool::new(true));
    let listeners: Vec<Arc<dyn MigrationListener>> = vec![
        Arc::new(LoggingMigrationListener::new()),
        Arc::new(DisableOnCompleteListener::new(Arc::clone(&enabled))),
    ];
    let runner = MigrationRunner::new(
        app.config.migration.clone(),
        Arc::new(candidates),
        Arc::new(migrator),
        listeners,
    );

    let result = runner.execute().await;

    if !enabled.load(Ordering::SeqCst) {
        app.config.migration.enabled = false;
        if let Err(e) = app.config.save(config_path) {
            warn!(error = %e, "failed to persist migration flag");
        }
    }

    let result = result.map_err(|e| miette::miette!("{}", e))?;
    println!(
        "migrated {}/{} players ({} failed) in {}ms",
        result.successful,
        result.total,
        result.failed,
        result.elapsed.as_millis()
    );
    Ok(())
}
