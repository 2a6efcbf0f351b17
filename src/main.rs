mod config;
mod logging;
mod store;
mod web;

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::{Config, DatabaseConfig};
use crate::store::{PostgresStore, SharedStore, SqliteStore};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("mission-control failed to start: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let (log_tx, _) = tokio::sync::broadcast::channel(256);
    logging::init(log_tx.clone());

    let config = Config::from_env();
    if config.secret_key.is_none() {
        warn!("SECRET_KEY not set! Using fallback - NOT SECURE FOR PRODUCTION!");
    }

    let store: SharedStore = match &config.database {
        DatabaseConfig::Postgres { url } => {
            info!("Using PostgreSQL database from DATABASE_URL");
            Arc::new(PostgresStore::connect(url)?)
        }
        DatabaseConfig::Sqlite { path } => {
            info!("Using SQLite database at {}", path.display());
            Arc::new(SqliteStore::open(path).await?)
        }
    };

    // A broken database must not keep the server down: start anyway and let
    // the health endpoint report degraded until it recovers.
    match store::initialize(store.as_ref()).await {
        Ok(()) => info!("Mission Control initialized successfully"),
        Err(e) => error!("Database initialization error: {e:#}"),
    }

    web::serve(store, log_tx, config.port).await
}
