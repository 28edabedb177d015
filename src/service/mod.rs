//! Connector lifecycle service.
//!
//! Ties the catalog, state store, OAuth orchestrator, and connector store
//! together behind the operations an API surface needs: list providers,
//! start an authorization, complete a callback, create credential-based
//! connectors, disconnect, and run syncs.
//!
//! `complete_callback` never returns an error. The browser arrives here via
//! a provider redirect, so every outcome, success or failure, becomes a
//! redirect back to the admin UI with a query parameter describing what
//! happened.

use crate::catalog::{self, ProviderDescriptor};
use crate::connector::{
    AuthMethod, ConnectionStatus, Connector, ConnectorStore, CredentialBundle,
};
use crate::error::ConnectError;
use crate::oauth::{extract_account_id, extract_account_name, OAuthClient, StateStore};
use crate::sync::{ChunkSink, NotionAdapter, SyncAdapter, SyncOutcome, SyncStatus};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Catalog entry as shown to clients. Secrets and env var names stay out.
#[derive(Clone, Debug, Serialize)]
pub struct ProviderView {
    pub id: String,
    pub display_name: String,
    pub icon: String,
    pub category: String,
    pub description: String,
    pub supports_oauth: bool,
    pub supports_sync: bool,
    pub is_configured: bool,
}

pub struct ConnectorService {
    providers: Vec<ProviderDescriptor>,
    state_store: StateStore,
    oauth: OAuthClient,
    store: Arc<ConnectorStore>,
    adapters: Vec<Arc<dyn SyncAdapter>>,
    /// Where providers send the browser back to, registered on the OAuth app.
    callback_url: String,
    /// Admin UI base, the final destination of every callback redirect.
    admin_url: String,
}

impl ConnectorService {
    pub fn new(
        store: Arc<ConnectorStore>,
        oauth: OAuthClient,
        state_store: StateStore,
        callback_url: &str,
        admin_url: &str,
    ) -> Self {
        Self {
            providers: catalog::all().to_vec(),
            state_store,
            oauth,
            store,
            adapters: vec![Arc::new(NotionAdapter::new())],
            callback_url: callback_url.to_string(),
            admin_url: admin_url.trim_end_matches('/').to_string(),
        }
    }

    /// Replaces the provider catalog, for tests against local servers.
    pub fn with_providers(mut self, providers: Vec<ProviderDescriptor>) -> Self {
        self.providers = providers;
        self
    }

    /// Replaces the sync adapters.
    pub fn with_adapters(mut self, adapters: Vec<Arc<dyn SyncAdapter>>) -> Self {
        self.adapters = adapters;
        self
    }

    fn provider(&self, id: &str) -> Result<&ProviderDescriptor, ConnectError> {
        self.providers
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ConnectError::UnknownProvider(id.to_string()))
    }

    /// Every catalog entry with its configuration status, for the connect UI.
    pub fn list_available(&self) -> Vec<ProviderView> {
        self.providers
            .iter()
            .map(|p| ProviderView {
                id: p.id.clone(),
                display_name: p.display_name.clone(),
                icon: p.icon.clone(),
                category: p.category.clone(),
                description: p.description.clone(),
                supports_oauth: catalog::supports_oauth(p),
                supports_sync: p.supports_sync,
                is_configured: catalog::is_configured(p),
            })
            .collect()
    }

    /// Distinct provider categories in catalog order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for p in &self.providers {
            if !seen.contains(&p.category.as_str()) {
                seen.push(p.category.as_str());
            }
        }
        seen
    }

    /// Starts an OAuth flow: issues a CSRF state token and returns the
    /// provider authorization URL to send the user to.
    pub fn authorize(
        &self,
        customer_id: Uuid,
        provider_id: &str,
    ) -> Result<String, ConnectError> {
        let provider = self.provider(provider_id)?;
        // Validate before issuing a state token, or a rejected attempt
        // would leave an orphan entry until the TTL purge.
        if !catalog::supports_oauth(provider) {
            return Err(ConnectError::UnsupportedProvider(provider.id.clone()));
        }
        let state = self
            .state_store
            .create(&customer_id.to_string(), provider_id);
        let url = self
            .oauth
            .authorization_url(provider, &state, &self.callback_url)?;
        info!(provider = %provider_id, customer = %customer_id, "authorization started");
        Ok(url)
    }

    /// Completes a provider callback and returns the admin-UI redirect URL.
    pub async fn complete_callback(
        &self,
        code: Option<&str>,
        state: Option<&str>,
        error: Option<&str>,
    ) -> String {
        // Provider-side denial: identify the attempt if we can, then bail.
        if let Some(err) = error {
            let provider_id = state
                .and_then(|s| self.state_store.consume(s))
                .map(|entry| entry.provider_id);
            warn!(error = %err, provider = ?provider_id, "provider returned an error");
            return match provider_id {
                Some(id) => self.error_redirect(&id),
                None => self.error_redirect(err),
            };
        }

        let (code, state) = match (code, state) {
            (Some(c), Some(s)) => (c, s),
            _ => return self.error_redirect("missing_params"),
        };

        let entry = match self.state_store.consume(state) {
            Some(entry) => entry,
            None => {
                warn!(error = %ConnectError::InvalidOrExpiredState, "callback rejected");
                return self.error_redirect("invalid_state");
            }
        };

        let provider = match self.provider(&entry.provider_id) {
            Ok(p) => p,
            Err(_) => return self.error_redirect("unknown_provider"),
        };

        match self.finish_connect(provider, &entry.customer_id, code).await {
            Ok(()) => format!(
                "{}?oauth_success={}",
                self.admin_url,
                urlencoding::encode(&provider.id)
            ),
            Err(e) => {
                warn!(provider = %provider.id, error = %e, "oauth connect failed");
                self.error_redirect(&provider.id)
            }
        }
    }

    /// Token exchange through connector creation. Split out so the callback
    /// can map any failure to a provider-tagged redirect.
    async fn finish_connect(
        &self,
        provider: &ProviderDescriptor,
        customer_id: &str,
        code: &str,
    ) -> Result<()> {
        let customer_id: Uuid = customer_id.parse().context("Invalid customer id in state")?;
        let tokens = self
            .oauth
            .exchange_code(provider, code, &self.callback_url)
            .await?;

        // Identity is best-effort; a userinfo hiccup must not lose the tokens.
        let userinfo = self
            .oauth
            .fetch_user_info(provider, &tokens.access_token)
            .await
            .unwrap_or_else(|e| {
                warn!(provider = %provider.id, error = %e, "userinfo fetch failed");
                serde_json::Value::Object(Default::default())
            });

        let account_id = extract_account_id(&userinfo);
        let account_name = extract_account_name(provider, &userinfo);

        let mut credentials = CredentialBundle::new();
        credentials.set("access_token", &tokens.access_token);
        credentials.set_opt("refresh_token", tokens.refresh_token.as_deref());
        credentials.set_opt("token_type", tokens.token_type.as_deref());
        credentials.set_opt("scope", tokens.scope.as_deref());
        credentials.set_opt("workspace_id", tokens.workspace_id.as_deref());
        credentials.set_opt("workspace_name", tokens.workspace_name.as_deref());

        let now = Utc::now();
        let connector = Connector {
            id: Uuid::new_v4(),
            customer_id,
            app_name: provider.id.clone(),
            display_name: if account_name.is_empty() {
                provider.display_name.clone()
            } else {
                account_name.clone()
            },
            credentials,
            auth_method: AuthMethod::OAuth,
            connection_status: ConnectionStatus::Connected,
            status_message: Some("Connected".to_string()),
            external_account_id: (!account_id.is_empty()).then_some(account_id),
            external_account_name: (!account_name.is_empty()).then_some(account_name),
            is_active: true,
            token_expires_at: tokens.expires_in.map(|secs| now + Duration::seconds(secs)),
            last_health_check_at: None,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(&connector)?;
        info!(provider = %provider.id, id = %connector.id, "connector created");
        Ok(())
    }

    fn error_redirect(&self, reason: &str) -> String {
        format!(
            "{}?oauth_error={}",
            self.admin_url,
            urlencoding::encode(reason)
        )
    }

    /// Creates a connector from manually entered credentials (API keys,
    /// basic auth) for providers without an OAuth flow.
    pub fn create_credential_connector(
        &self,
        customer_id: Uuid,
        provider_id: &str,
        credentials: CredentialBundle,
    ) -> Result<Connector> {
        let provider = self.provider(provider_id)?;
        let display_name = credentials
            .get("username")
            .map(str::to_string)
            .unwrap_or_else(|| provider.display_name.clone());

        let now = Utc::now();
        let connector = Connector {
            id: Uuid::new_v4(),
            customer_id,
            app_name: provider.id.clone(),
            display_name,
            credentials,
            auth_method: AuthMethod::Credential,
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
        self.store.insert(&connector)?;
        info!(provider = %provider_id, id = %connector.id, "credential connector created");
        Ok(connector)
    }

    pub fn list_connectors(&self, customer_id: Uuid) -> Result<Vec<Connector>> {
        self.store.list_for_customer(customer_id)
    }

    pub fn get_connector(&self, id: Uuid, customer_id: Uuid) -> Result<Option<Connector>> {
        self.store.get(id, customer_id)
    }

    /// User-initiated disconnect. Terminal for the connector.
    pub fn disconnect(&self, id: Uuid, customer_id: Uuid) -> Result<bool> {
        self.store.disconnect(id, customer_id)
    }

    /// Runs a content sync for one connector.
    ///
    /// A successful run stamps `last_synced_at` (guarded, so a concurrent
    /// disconnect still wins). A failed run carries its message on the
    /// returned outcome; connection status is the health sweeper's verdict,
    /// not the sync's.
    pub async fn sync_connector(
        &self,
        id: Uuid,
        customer_id: Uuid,
        site_id: &str,
        sink: &dyn ChunkSink,
    ) -> Result<SyncOutcome> {
        let connector = self
            .store
            .get(id, customer_id)?
            .context("Connector not found")?;
        if connector.connection_status == ConnectionStatus::Disconnected || !connector.is_active {
            anyhow::bail!("Connector is disconnected");
        }

        let adapter = self
            .adapters
            .iter()
            .find(|a| a.app_name() == connector.app_name)
            .with_context(|| {
                format!("Provider {} does not support sync", connector.app_name)
            })?;

        let outcome = adapter.sync(&connector, site_id, sink).await;
        match outcome.status {
            SyncStatus::Completed => {
                self.store.mark_synced(id)?;
            }
            SyncStatus::Failed => {
                warn!(
                    connector = %connector.app_name,
                    id = %id,
                    error = ?outcome.error_message,
                    "sync failed"
                );
            }
        }
        Ok(outcome)
    }
}
