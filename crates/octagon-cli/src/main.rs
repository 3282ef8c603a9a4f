use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use octagon_storage::{MemoryStore, PgStore, Store};
use octagon_sync::{SyncConfig, SyncServices};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "octagon")]
#[command(about = "Octagon MMA data sync")]
struct Cli {
    /// Run against an in-memory store (dry run, nothing persisted).
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Organizations, events and fight cards from the configured providers.
    Sync {
        #[command(subcommand)]
        target: Option<SyncTarget>,
    },
    /// UFC athlete roster.
    Roster {
        #[command(subcommand)]
        target: RosterTarget,
    },
    Migrate,
    Serve,
}

#[derive(Debug, Subcommand)]
enum SyncTarget {
    All,
    Organizations,
    Upcoming,
    Past {
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Subcommand)]
enum RosterTarget {
    Full,
    Top,
    Records,
    Slugs {
        #[arg(required = true)]
        slugs: Vec<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("octagon=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

async fn open_store(config: &SyncConfig, memory: bool) -> Result<Arc<dyn Store>> {
    if memory {
        info!("using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = PgStore::connect(&config.database_url)
        .await
        .context("connecting to DATABASE_URL")?;
    Ok(Arc::new(store))
}

fn print_report<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = SyncConfig::from_env();

    match cli.command.unwrap_or(Commands::Sync { target: None }) {
        Commands::Sync { target } => {
            let store = open_store(&config, cli.memory).await?;
            let services = SyncServices::from_config(&config, store).await?;
            let result = match target.unwrap_or(SyncTarget::All) {
                SyncTarget::All => services.mma.sync_all().await,
                SyncTarget::Organizations => services.mma.sync_organizations().await,
                SyncTarget::Upcoming => services.mma.sync_upcoming_events().await,
                SyncTarget::Past { limit } => {
                    services
                        .mma
                        .sync_past_events(limit.unwrap_or(config.past_events_limit))
                        .await
                }
            };
            print_report(&result)?;
        }
        Commands::Roster { target } => {
            let store = open_store(&config, cli.memory).await?;
            let services = SyncServices::from_config(&config, store).await?;
            let result = match target {
                RosterTarget::Full => services.roster.sync_full_roster().await,
                RosterTarget::Top => services.roster.sync_top_fighters().await,
                RosterTarget::Records => services.roster.update_all_records().await,
                RosterTarget::Slugs { slugs } => services.roster.sync_fighters_by_slug(&slugs).await,
            };
            print_report(&result)?;
        }
        Commands::Migrate => {
            if cli.memory {
                bail!("migrate needs a database; drop --memory");
            }
            let store = PgStore::connect(&config.database_url)
                .await
                .context("connecting to DATABASE_URL")?;
            store.migrate().await?;
            println!("migrations applied");
        }
        Commands::Serve => {
            let store = open_store(&config, cli.memory).await?;
            octagon_web::serve(&config, store).await?;
        }
    }

    Ok(())
}
