//! Single-record and leaderboard commands.

use std::path::Path;

use miette::Result;
use tracing::info;

use spenttime_core::{DeleteStatus, DurationStyle, SaveReason, SpentTime, parse_duration};

use crate::app::App;

pub async fn show(db: &Path, config: &Path, player: &str, style: DurationStyle) -> Result<()> {
    let app = App::open(db, config)?;
    let record = app.resolve(player).await?;
    println!(
        "{} ({}): {}",
        record.display_name(),
        record.identity(),
        style.format(record.spent_time().to_duration())
    );
    Ok(())
}

pub async fn set(db: &Path, config: &Path, player: &str, time: &str) -> Result<()> {
    let duration = parse_duration(time).map_err(|e| miette::miette!("{}", e))?;
    let time = SpentTime::from_duration(duration).map_err(|e| miette::miette!("{}", e))?;

    let app = App::open(db, config)?;
    let mut record = app.resolve(player).await?;
    record.set_spent_time(time);
    let saved = app
        .service
        .save(record, SaveReason::SetCommand)
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    info!(identity = %saved.identity(), millis = time.as_millis(), "spent time set");
    println!(
        "{} now has {}",
        saved.display_name(),
        DurationStyle::Long.format(saved.spent_time().to_duration())
    );
    Ok(())
}

pub async fn reset(db: &Path, config: &Path, player: &str) -> Result<()> {
    let app = App::open(db, config)?;
    let record = app.resolve(player).await?;
    let saved = app
        .service
        .reset(record)
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    println!("reset {}", saved.display_name());
    Ok(())
}

pub async fn reset_all(db: &Path, config: &Path) -> Result<()> {
    let app = App::open(db, config)?;
    let reset = app
        .service
        .reset_all()
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    println!("reset {reset} records");
    Ok(())
}

pub async fn delete(db: &Path, config: &Path, player: &str) -> Result<()> {
    let app = App::open(db, config)?;
    let result = match uuid::Uuid::parse_str(player) {
        Ok(identity) => app.service.delete(identity).await,
        Err(_) => app.service.delete_by_name(player).await,
    }
    .map_err(|e| miette::miette!("{}", e))?;

    match result.status {
        DeleteStatus::Deleted => println!("deleted {player}"),
        DeleteStatus::NotFound => return Err(miette::miette!("no record for {}", player)),
        DeleteStatus::Failed => return Err(miette::miette!("failed to delete {}", player)),
    }
    Ok(())
}

pub async fn top(
    db: &Path,
    config: &Path,
    limit: Option<usize>,
    style: DurationStyle,
) -> Result<()> {
    let app = App::open(db, config)?;
    let limit = limit.unwrap_or(app.config.leaderboard.display_limit);
    let rows = app
        .leaderboard
        .get_or_refresh(limit)
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    if rows.is_empty() {
        println!("no records yet");
        return Ok(());
    }
    for line in render_leaderboard(&rows, style) {
        println!("{line}");
    }
    Ok(())
}

/// One line per row: position, name, formatted time.
pub fn render_leaderboard(rows: &[spenttime_core::Record], style: DurationStyle) -> Vec<String> {
    rows.iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{:>3}. {:<16} {}",
                i + 1,
                r.display_name(),
                style.format(r.spent_time().to_duration())
            )
        })
        .collect()
}

pub fn init_config(config: &Path) -> Result<()> {
    let loaded = spenttime_core::SpentTimeConfig::load(config).map_err(|e| miette::miette!("{}", e))?;
    loaded.save(config).map_err(|e| miette::miette!("{}", e))?;
    println!("wrote {}", config.display());
    Ok(())
}
