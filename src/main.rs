use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tether::config;
use tether::connector::{validate_key, ConnectorStore};
use tether::oauth::OAuthClient;
use tether::sweeper::HealthSweeper;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tether=info".into()),
        )
        .init();

    info!("Tether starting...");

    let config_path =
        std::env::var("TETHER_CONFIG").unwrap_or_else(|_| "tether.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        config::load_config(&config_path)?
    } else {
        info!(path = %config_path, "no config file, using defaults");
        config::TetherConfig::default()
    };

    let key_base64 = std::env::var("TETHER_ENCRYPTION_KEY")
        .context("TETHER_ENCRYPTION_KEY must be set (base64, 32 bytes)")?;
    let key = validate_key(&key_base64)?;

    let store = Arc::new(ConnectorStore::new(&config.database.path, key)?);
    let oauth = OAuthClient::with_timeouts(
        Duration::from_secs(config.oauth.token_timeout_seconds),
        Duration::from_secs(config.oauth.userinfo_timeout_seconds),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = HealthSweeper::new(
        store,
        oauth,
        Duration::from_secs(config.sweeper.interval_seconds),
    );
    let handle = sweeper.spawn(shutdown_rx);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    handle.await.context("Sweeper task panicked")?;

    info!("Tether stopped");
    Ok(())
}
