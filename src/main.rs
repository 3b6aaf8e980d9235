//! ignored - line-based chat server with per-user ignore lists.
//!
//! Users can ignore each other: an ignored user's chat lines are not
//! delivered to the ignorer and their whispers are refused.

mod config;
mod db;
mod error;
mod handlers;
mod network;
mod state;

use crate::config::{Config, validate};
use crate::db::Database;
use crate::network::Gateway;
use crate::state::{Hub, IgnoreCache, IgnoreService};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        server = %config.server.name,
        database = config.database_path(),
        block_private_messages = config.ignore.block_private_messages,
        "Starting ignored"
    );

    let db = Database::new(config.database_path()).await.map_err(|e| {
        error!(path = config.database_path(), error = %e, "Failed to open database");
        e
    })?;

    let cache = Arc::new(IgnoreCache::new());
    let ignores = Arc::new(IgnoreService::new(db.clone(), cache));
    let listen_addr = config.listen.address;
    let hub = Arc::new(Hub::new(config, db.clone(), ignores));

    let gateway = Gateway::bind(listen_addr, Arc::clone(&hub)).await.map_err(|e| {
        error!(address = %listen_addr, error = %e, "Failed to bind listener");
        e
    })?;

    tokio::select! {
        result = gateway.run() => {
            if let Err(e) = &result {
                error!(error = %e, "Gateway stopped");
            }
            result?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!(
                online = hub.roster.online_count(),
                cached = hub.ignores.cache_size(),
                "Shutdown requested"
            );
        }
    }

    hub.ignores.reset_cache();
    db.close().await;
    info!("Database closed, exiting");
    Ok(())
}
