use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use newsfeed_ingest::config::Config;
use newsfeed_ingest::ingest::Ingestor;
use newsfeed_ingest::storage::{Database, DatabaseError};

#[derive(Parser, Debug)]
#[command(name = "newsfeed-ingest", about = "Poll news feeds and store new entries")]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE", default_value = "newsfeed-ingest.toml")]
    config: PathBuf,

    /// Database file, overrides `database_path` from the config
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Run a single ingestion cycle and exit, regardless of the configured interval
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    if let Some(database) = args.database {
        config.database_path = database;
    }

    let db_path = config
        .database_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: the database is locked by another process. Please try again later.");
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    db.sync_sources(&config.source_configs())
        .await
        .context("Failed to sync sources")?;

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .build()
        .context("Failed to build HTTP client")?;

    let ingestor = Ingestor::new(db, client)
        .with_fetch_policy(config.fetch_policy())
        .with_max_concurrent_sources(config.max_concurrent_sources);

    if args.once || config.refresh_interval_minutes == 0 {
        ingestor
            .run_cycle()
            .await
            .context("Failed to list sources")?;
        return Ok(());
    }

    let period = Duration::from_secs(config.refresh_interval_minutes.saturating_mul(60));
    ingestor.run_until(period, shutdown_signal()).await;
    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}
