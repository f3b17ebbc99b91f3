//! spenttime: operator CLI for spent-time records.
//!
//! Subcommands:
//! - `migrate`: one-time bootstrap migration from a population file
//! - `show` / `set` / `reset` / `delete`: single-record operations
//! - `reset-all`: zero every stored record
//! - `top`: print the leaderboard
//! - `init-config`: write the effective config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spenttime_core::DurationStyle;

mod app;
mod commands;
mod migrate;

#[derive(Parser)]
#[command(name = "spenttime")]
#[command(about = "Track and rank time spent per player", long_about = None)]
struct Cli {
    /// SQLite database path
    #[arg(long, global = true, env = "SPENTTIME_DB", default_value = "spenttime.db")]
    db: PathBuf,

    /// JSON config path
    #[arg(long, global = true, env = "SPENTTIME_CONFIG", default_value = "spenttime.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed records for an existing population (runs once unless forced)
    Migrate {
        /// JSON array of {identity, name?, spent_millis?}
        #[arg(value_name = "POPULATION")]
        population: PathBuf,

        /// Run even if a previous migration already completed
        #[arg(long)]
        force: bool,
    },

    /// Show one player's spent time
    Show {
        /// Player UUID or display name
        player: String,

        /// Output style: compact, long, long-with-and, natural
        #[arg(long, default_value = "long")]
        style: DurationStyle,
    },

    /// Set one player's spent time (e.g. 1h30m)
    Set {
        player: String,
        time: String,
    },

    /// Reset one player's spent time to zero
    Reset { player: String },

    /// Reset every stored player's spent time to zero
    ResetAll,

    /// Delete one player's record
    Delete { player: String },

    /// Print the leaderboard
    Top {
        /// Rows to print (defaults to the configured display limit)
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value = "compact")]
        style: DurationStyle,
    },

    /// Write the effective configuration to the config path
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "spenttime=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate { population, force } => {
            migrate::run(&cli.db, &cli.config, &population, force).await
        }
        Commands::Show { player, style } => commands::show(&cli.db, &cli.config, &player, style).await,
        Commands::Set { player, time } => commands::set(&cli.db, &cli.config, &player, &time).await,
        Commands::Reset { player } => commands::reset(&cli.db, &cli.config, &player).await,
        Commands::ResetAll => commands::reset_all(&cli.db, &cli.config).await,
        Commands::Delete { player } => commands::delete(&cli.db, &cli.config, &player).await,
        Commands::Top { limit, style } => commands::top(&cli.db, &cli.config, limit, style).await,
        Commands::InitConfig => commands::init_config(&cli.config),
    }
}
