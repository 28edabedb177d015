//! Connector entities: the persistent record of one customer's link to one
//! external application, plus the credential bundle stored encrypted
//! alongside it.

mod encryption;
mod store;

pub use encryption::validate_key;
pub use store::ConnectorStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// How the connector authenticates against the remote service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    OAuth,
    Credential,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::OAuth => "oauth",
            AuthMethod::Credential => "credential",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "oauth" => Some(AuthMethod::OAuth),
            "credential" => Some(AuthMethod::Credential),
            _ => None,
        }
    }
}

/// Connector lifecycle state.
///
/// `Disconnected` is terminal: once a user disconnects, no background
/// process may resurrect the connector. Reconnecting creates a new record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Error,
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
            ConnectionStatus::Disconnected => "disconnected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "connected" => Some(ConnectionStatus::Connected),
            "error" => Some(ConnectionStatus::Error),
            "disconnected" => Some(ConnectionStatus::Disconnected),
            _ => None,
        }
    }
}

/// Opaque secret material for one connector.
///
/// Backed by a string map so provider-specific extras (workspace ids,
/// granted scopes) travel with the tokens without schema churn. Serialized
/// with a version tag and stored encrypted; never logged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialBundle {
    fields: BTreeMap<String, String>,
}

impl CredentialBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.fields.insert(key.to_string(), value.to_string());
    }

    /// Sets the key only when the value is non-empty.
    pub fn set_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !v.is_empty() {
                self.fields.insert(key.to_string(), v.to_string());
            }
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.fields.remove(key);
    }

    pub fn access_token(&self) -> Option<&str> {
        self.get("access_token")
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.get("refresh_token")
    }

    pub fn api_key(&self) -> Option<&str> {
        self.get("api_key")
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Display-safe view: every value masked, no key dropped.
    pub fn masked(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), mask_secret(v)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Masks a secret for display. Long values keep a recognizable prefix and
/// suffix; short ones reveal at most four leading characters.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 11 {
        let head: String = chars[..7].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        let head: String = chars.iter().take(4).collect();
        format!("{}...", head)
    }
}

/// One customer's link to one external application.
#[derive(Clone, Debug)]
pub struct Connector {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Catalog provider id, e.g. "notion".
    pub app_name: String,
    pub display_name: String,
    pub credentials: CredentialBundle,
    pub auth_method: AuthMethod,
    pub connection_status: ConnectionStatus,
    pub status_message: Option<String>,
    /// Remote account identity, captured at connect time.
    pub external_account_id: Option<String>,
    pub external_account_name: Option<String>,
    pub is_active: bool,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub last_health_check_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret_long_value() {
        assert_eq!(mask_secret("secret_abcdefghij1234"), "secret_...1234");
    }

    #[test]
    fn test_mask_secret_short_value() {
        assert_eq!(mask_secret("abcdefgh"), "abcd...");
        assert_eq!(mask_secret("ab"), "ab...");
        assert_eq!(mask_secret(""), "...");
    }

    #[test]
    fn test_mask_secret_boundary() {
        // 11 chars takes the short branch, 12 the long one
        assert_eq!(mask_secret("abcdefghijk"), "abcd...");
        assert_eq!(mask_secret("abcdefghijkl"), "abcdefg...ijkl");
    }

    #[test]
    fn test_bundle_accessors() {
        let mut bundle = CredentialBundle::new();
        assert!(bundle.is_empty());

        bundle.set("access_token", "at_1");
        bundle.set_opt("refresh_token", Some("rt_1"));
        bundle.set_opt("scope", Some(""));
        bundle.set_opt("workspace_id", None);

        assert_eq!(bundle.access_token(), Some("at_1"));
        assert_eq!(bundle.refresh_token(), Some("rt_1"));
        assert_eq!(bundle.get("scope"), None);
        assert_eq!(bundle.get("workspace_id"), None);
    }

    #[test]
    fn test_bundle_masked_view() {
        let mut bundle = CredentialBundle::new();
        bundle.set("access_token", "secret_abcdefghij1234");
        bundle.set("api_key", "short");

        let masked = bundle.masked();
        assert_eq!(masked["access_token"], "secret_...1234");
        assert_eq!(masked["api_key"], "shor...");
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            ConnectionStatus::Connected,
            ConnectionStatus::Error,
            ConnectionStatus::Disconnected,
        ] {
            assert_eq!(ConnectionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ConnectionStatus::parse("bogus"), None);
    }
}
