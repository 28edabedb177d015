//! Background health sweeper.
//!
//! Every interval, probes each active OAuth connector's token against the
//! provider's userinfo endpoint, attempting a refresh when the probe fails.
//! One connector's failure never stops the sweep, and every status write
//! goes through the store's guarded updates so a user disconnect that lands
//! mid-sweep always wins.

use crate::catalog::{self, ProviderDescriptor};
use crate::connector::{ConnectionStatus, Connector, ConnectorStore};
use crate::oauth::OAuthClient;
use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub struct HealthSweeper {
    store: Arc<ConnectorStore>,
    oauth: OAuthClient,
    providers: Vec<ProviderDescriptor>,
    interval: Duration,
}

impl HealthSweeper {
    pub fn new(store: Arc<ConnectorStore>, oauth: OAuthClient, interval: Duration) -> Self {
        Self {
            store,
            oauth,
            providers: catalog::all().to_vec(),
            interval,
        }
    }

    /// Replaces the provider catalog, for tests against local servers.
    pub fn with_providers(mut self, providers: Vec<ProviderDescriptor>) -> Self {
        self.providers = providers;
        self
    }

    /// Runs the sweep loop until the shutdown channel flips to true.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval_secs = self.interval.as_secs(), "health sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_cycle().await {
                            error!(error = %e, "health sweep cycle failed");
                        }
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("health sweeper stopping");
                            break;
                        }
                    }
                }
            }
        })
    }

    /// One full sweep over the active OAuth population.
    pub async fn run_cycle(&self) -> Result<()> {
        let connectors = self.store.list_active_oauth()?;
        debug!(count = connectors.len(), "health sweep starting");

        for connector in &connectors {
            // Isolation: a panic-free probe failure is logged and skipped.
            if let Err(e) = self.probe_connector(connector).await {
                warn!(
                    connector = %connector.app_name,
                    id = %connector.id,
                    error = %e,
                    "health probe failed"
                );
            }
        }
        Ok(())
    }

    async fn probe_connector(&self, connector: &Connector) -> Result<()> {
        // Unknown provider, no introspection endpoint, or no token: nothing
        // meaningful to probe, leave the connector untouched.
        let provider = match self.providers.iter().find(|p| p.id == connector.app_name) {
            Some(p) => p,
            None => return Ok(()),
        };
        if provider.userinfo_url.is_empty() {
            return Ok(());
        }
        let access_token = match connector.credentials.access_token() {
            Some(t) => t,
            None => return Ok(()),
        };

        let (healthy, message) = self.oauth.check_health(provider, access_token).await;
        if healthy {
            self.store
                .record_health(connector.id, ConnectionStatus::Connected, None)?;
            return Ok(());
        }

        debug!(connector = %connector.app_name, verdict = %message, "token unhealthy, trying refresh");
        match connector.credentials.refresh_token() {
            Some(refresh_token) => {
                match self.oauth.refresh_access_token(provider, refresh_token).await {
                    Ok(tokens) => {
                        let mut refreshed = connector.credentials.clone();
                        refreshed.set("access_token", &tokens.access_token);
                        refreshed.set_opt("refresh_token", tokens.refresh_token.as_deref());
                        let expires_at = tokens
                            .expires_in
                            .map(|secs| Utc::now() + ChronoDuration::seconds(secs));

                        // Guarded writes: both no-op if the user disconnected
                        // while the refresh was in flight.
                        self.store
                            .store_refreshed_tokens(connector.id, &refreshed, expires_at)?;
                        self.store.record_health(
                            connector.id,
                            ConnectionStatus::Connected,
                            None,
                        )?;
                        info!(connector = %connector.app_name, id = %connector.id, "token refreshed");
                    }
                    Err(e) => {
                        warn!(connector = %connector.app_name, error = %e, "token refresh failed");
                        self.store.record_health(
                            connector.id,
                            ConnectionStatus::Error,
                            Some(&message),
                        )?;
                    }
                }
            }
            None => {
                self.store
                    .record_health(connector.id, ConnectionStatus::Error, Some(&message))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{AuthMethod, Connector, CredentialBundle};
    use crate::catalog::ProviderDescriptor;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn test_provider(server_url: &str) -> ProviderDescriptor {
        ProviderDescriptor::new("testapp", "Test App", "", "Other", "")
            .oauth(
                &format!("{}/authorize", server_url),
                &format!("{}/token", server_url),
            )
            .client_env("SWEEP_TEST_CLIENT_ID", "SWEEP_TEST_CLIENT_SECRET")
            .userinfo(&format!("{}/userinfo", server_url))
    }

    fn seed_connector(
        store: &ConnectorStore,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Connector {
        let mut credentials = CredentialBundle::new();
        credentials.set("access_token", access_token);
        credentials.set_opt("refresh_token", refresh_token);
        let now = Utc::now();
        let connector = Connector {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            app_name: "testapp".to_string(),
            display_name: "Test App".to_string(),
            credentials,
            auth_method: AuthMethod::OAuth,
            connection_status: ConnectionStatus::Connected,
            status_message: Some("Connected".to_string()),
            external_account_id: None,
            external_account_name: None,
            is_active: true,
            token_expires_at: None,
            last_health_check_at: None,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        store.insert(&connector).unwrap();
        connector
    }

    fn sweeper_for(server_url: &str, store: Arc<ConnectorStore>) -> HealthSweeper {
        std::env::set_var("SWEEP_TEST_CLIENT_ID", "cid");
        std::env::set_var("SWEEP_TEST_CLIENT_SECRET", "csecret");
        HealthSweeper::new(store, OAuthClient::new(), Duration::from_secs(300))
            .with_providers(vec![test_provider(server_url)])
    }

    #[tokio::test]
    async fn test_healthy_connector_stays_connected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/userinfo")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let store =
            Arc::new(ConnectorStore::new(dir.path().join("t.db"), vec![5u8; 32]).unwrap());
        let connector = seed_connector(&store, "at_ok", None);

        sweeper_for(&server.url(), store.clone()).run_cycle().await.unwrap();

        let loaded = store.get_by_id(connector.id).unwrap().unwrap();
        assert_eq!(loaded.connection_status, ConnectionStatus::Connected);
        assert!(loaded.status_message.is_none());
        assert!(loaded.last_health_check_at.is_some());
    }

    #[tokio::test]
    async fn test_unhealthy_with_refresh_recovers() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/userinfo")
            .with_status(401)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("refresh_token".into(), "rt_1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at_new","refresh_token":"rt_2","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let store =
            Arc::new(ConnectorStore::new(dir.path().join("t.db"), vec![5u8; 32]).unwrap());
        let connector = seed_connector(&store, "at_stale", Some("rt_1"));

        sweeper_for(&server.url(), store.clone()).run_cycle().await.unwrap();

        let loaded = store.get_by_id(connector.id).unwrap().unwrap();
        assert_eq!(loaded.connection_status, ConnectionStatus::Connected);
        assert!(loaded.status_message.is_none());
        assert_eq!(loaded.credentials.access_token(), Some("at_new"));
        assert_eq!(loaded.credentials.refresh_token(), Some("rt_2"));
        assert!(loaded.token_expires_at.is_some());
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_unhealthy_without_refresh_marks_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/userinfo")
            .with_status(401)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let store =
            Arc::new(ConnectorStore::new(dir.path().join("t.db"), vec![5u8; 32]).unwrap());
        let connector = seed_connector(&store, "at_dead", None);

        sweeper_for(&server.url(), store.clone()).run_cycle().await.unwrap();

        let loaded = store.get_by_id(connector.id).unwrap().unwrap();
        assert_eq!(loaded.connection_status, ConnectionStatus::Error);
        assert_eq!(
            loaded.status_message.as_deref(),
            Some("token expired or revoked")
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_marks_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/userinfo")
            .with_status(401)
            .create_async()
            .await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body("invalid_grant")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let store =
            Arc::new(ConnectorStore::new(dir.path().join("t.db"), vec![5u8; 32]).unwrap());
        let connector = seed_connector(&store, "at_dead", Some("rt_dead"));

        sweeper_for(&server.url(), store.clone()).run_cycle().await.unwrap();

        let loaded = store.get_by_id(connector.id).unwrap().unwrap();
        assert_eq!(loaded.connection_status, ConnectionStatus::Error);
        assert_eq!(
            loaded.status_message.as_deref(),
            Some("token expired or revoked")
        );
        // The stale token bundle is left alone on a failed refresh
        assert_eq!(loaded.credentials.access_token(), Some("at_dead"));
    }

    #[tokio::test]
    async fn test_unknown_provider_left_untouched() {
        let dir = TempDir::new().unwrap();
        let store =
            Arc::new(ConnectorStore::new(dir.path().join("t.db"), vec![5u8; 32]).unwrap());
        let connector = seed_connector(&store, "at_1", None);

        // Catalog without this connector's provider
        let sweeper = HealthSweeper::new(store.clone(), OAuthClient::new(), Duration::from_secs(300))
            .with_providers(Vec::new());
        sweeper.run_cycle().await.unwrap();

        let loaded = store.get_by_id(connector.id).unwrap().unwrap();
        assert_eq!(loaded.connection_status, ConnectionStatus::Connected);
        assert!(loaded.last_health_check_at.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_not_fatal_to_cycle() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/userinfo")
            .with_status(503)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let store =
            Arc::new(ConnectorStore::new(dir.path().join("t.db"), vec![5u8; 32]).unwrap());
        let first = seed_connector(&store, "at_1", None);
        let second = seed_connector(&store, "at_2", None);

        sweeper_for(&server.url(), store.clone()).run_cycle().await.unwrap();

        // Both were probed and marked, neither stopped the sweep
        for id in [first.id, second.id] {
            let loaded = store.get_by_id(id).unwrap().unwrap();
            assert_eq!(loaded.connection_status, ConnectionStatus::Error);
            assert_eq!(loaded.status_message.as_deref(), Some("HTTP 503"));
        }
    }
}
