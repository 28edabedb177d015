//! OAuth orchestrator: authorization URLs, token exchange, refresh,
//! userinfo, and connection health probes.
//!
//! All provider variance (Basic-auth token exchange, extra userinfo
//! headers, identity nesting) is driven by the descriptor's override
//! fields, never by matching on provider ids here.

use crate::catalog::{self, IdentityShape, ProviderDescriptor, TokenAuthStyle};
use crate::error::ConnectError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Default timeout for token exchange and refresh calls.
const TOKEN_TIMEOUT_SECS: u64 = 30;

/// Default timeout for identity (userinfo) calls.
const USERINFO_TIMEOUT_SECS: u64 = 15;

/// Identity fields tried in order across providers.
const ACCOUNT_NAME_KEYS: &[&str] = &[
    "email",
    "mail",
    "userPrincipalName",
    "login",
    "username",
    "name",
    "display_name",
];

/// Standard OAuth 2.0 token response, plus the provider-specific extras
/// worth carrying into the credential bundle (Notion returns workspace
/// fields alongside the token).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub workspace_name: Option<String>,
}

/// Stateless HTTP orchestrator for the OAuth flow.
///
/// Explicitly constructed and injected wherever it is needed (request
/// handling and the sweeper); one instance per process is the intent, not
/// an enforced singleton.
#[derive(Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    token_timeout: Duration,
    userinfo_timeout: Duration,
}

impl Default for OAuthClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OAuthClient {
    pub fn new() -> Self {
        Self::with_timeouts(
            Duration::from_secs(TOKEN_TIMEOUT_SECS),
            Duration::from_secs(USERINFO_TIMEOUT_SECS),
        )
    }

    pub fn with_timeouts(token_timeout: Duration, userinfo_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_timeout,
            userinfo_timeout,
        }
    }

    /// Builds the provider authorization URL for a pre-issued state token.
    ///
    /// Rejects providers without OAuth endpoints before touching the
    /// network or the environment.
    pub fn authorization_url(
        &self,
        provider: &ProviderDescriptor,
        state: &str,
        callback_url: &str,
    ) -> Result<String, ConnectError> {
        if !catalog::supports_oauth(provider) {
            return Err(ConnectError::UnsupportedProvider(provider.id.clone()));
        }
        let (client_id, _) = client_credentials(provider)?;

        let mut params: Vec<(&str, String)> = vec![
            ("client_id", client_id),
            ("redirect_uri", callback_url.to_string()),
            ("response_type", "code".to_string()),
            ("state", state.to_string()),
        ];
        if !provider.scopes.is_empty() {
            params.push(("scope", provider.scopes.join(" ")));
        }
        let query: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .chain(
                provider
                    .extra_auth_params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v))),
            )
            .collect();

        Ok(format!("{}?{}", provider.auth_url, query.join("&")))
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        provider: &ProviderDescriptor,
        code: &str,
        callback_url: &str,
    ) -> Result<TokenResponse, ConnectError> {
        let (client_id, client_secret) = client_credentials(provider)?;

        let mut form: HashMap<&str, String> = HashMap::new();
        form.insert("grant_type", "authorization_code".to_string());
        form.insert("code", code.to_string());
        form.insert("redirect_uri", callback_url.to_string());

        debug!(provider = %provider.id, "exchanging authorization code");

        let mut request = self
            .http
            .post(&provider.token_url)
            .header("Accept", "application/json")
            .timeout(self.token_timeout);

        match provider.token_auth {
            TokenAuthStyle::Body => {
                form.insert("client_id", client_id);
                form.insert("client_secret", client_secret);
            }
            TokenAuthStyle::BasicHeader => {
                let pair = BASE64.encode(format!("{}:{}", client_id, client_secret));
                request = request.header("Authorization", format!("Basic {}", pair));
            }
        }

        let response = request.form(&form).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectError::TokenExchangeFailed { status, body });
        }

        Ok(response.json::<TokenResponse>().await?)
    }

    /// Uses a refresh token to obtain a new access token.
    ///
    /// A failure here means the connector needs re-authorization.
    pub async fn refresh_access_token(
        &self,
        provider: &ProviderDescriptor,
        refresh_token: &str,
    ) -> Result<TokenResponse, ConnectError> {
        let (client_id, client_secret) = client_credentials(provider)?;

        let mut form: HashMap<&str, String> = HashMap::new();
        form.insert("grant_type", "refresh_token".to_string());
        form.insert("refresh_token", refresh_token.to_string());

        debug!(provider = %provider.id, "refreshing access token");

        let mut request = self
            .http
            .post(&provider.token_url)
            .header("Accept", "application/json")
            .timeout(self.token_timeout);

        match provider.token_auth {
            TokenAuthStyle::Body => {
                form.insert("client_id", client_id);
                form.insert("client_secret", client_secret);
            }
            TokenAuthStyle::BasicHeader => {
                let pair = BASE64.encode(format!("{}:{}", client_id, client_secret));
                request = request.header("Authorization", format!("Basic {}", pair));
            }
        }

        let response = request.form(&form).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectError::RefreshFailed { status, body });
        }

        Ok(response.json::<TokenResponse>().await?)
    }

    /// Fetches the provider userinfo document with bearer auth.
    ///
    /// Returns an empty object when the provider has no userinfo endpoint.
    pub async fn fetch_user_info(
        &self,
        provider: &ProviderDescriptor,
        access_token: &str,
    ) -> Result<Value, ConnectError> {
        if provider.userinfo_url.is_empty() {
            return Ok(Value::Object(Default::default()));
        }

        let mut request = self
            .http
            .get(&provider.userinfo_url)
            .bearer_auth(access_token)
            .timeout(self.userinfo_timeout);
        for (name, value) in &provider.userinfo_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ConnectError::UserinfoFailed {
                status: response.status().as_u16(),
            });
        }

        Ok(response.json::<Value>().await?)
    }

    /// Probes token validity via the userinfo endpoint.
    ///
    /// A provider without an introspection endpoint is assumed healthy
    /// until a sync call fails. Returns `(healthy, message)`.
    pub async fn check_health(
        &self,
        provider: &ProviderDescriptor,
        access_token: &str,
    ) -> (bool, String) {
        if provider.userinfo_url.is_empty() {
            return (true, "no health check available".to_string());
        }

        match self.fetch_user_info(provider, access_token).await {
            Ok(_) => (true, "Connected".to_string()),
            Err(ConnectError::UserinfoFailed { status: 401 }) => {
                (false, "token expired or revoked".to_string())
            }
            Err(ConnectError::UserinfoFailed { status }) => (false, format!("HTTP {}", status)),
            Err(e) => (false, e.to_string()),
        }
    }
}

/// Resolves the provider's OAuth app credentials from the environment at
/// call time. Never cached, never logged.
fn client_credentials(provider: &ProviderDescriptor) -> Result<(String, String), ConnectError> {
    let misconfigured = || ConnectError::MisconfiguredProvider {
        provider: provider.id.clone(),
        client_id_env: provider.client_id_env.clone(),
        client_secret_env: provider.client_secret_env.clone(),
    };

    if provider.client_id_env.is_empty() || provider.client_secret_env.is_empty() {
        return Err(misconfigured());
    }
    let client_id = std::env::var(&provider.client_id_env).unwrap_or_default();
    let client_secret = std::env::var(&provider.client_secret_env).unwrap_or_default();
    if client_id.is_empty() || client_secret.is_empty() {
        return Err(misconfigured());
    }
    Ok((client_id, client_secret))
}

/// Extracts a human-readable account identifier from a userinfo document.
///
/// Tries the common flat field names first, then the descriptor's nested
/// shape. Empty string means "use the provider display name".
pub fn extract_account_name(provider: &ProviderDescriptor, userinfo: &Value) -> String {
    for key in ACCOUNT_NAME_KEYS {
        if let Some(val) = userinfo.get(*key).and_then(Value::as_str) {
            if !val.is_empty() {
                return val.to_string();
            }
        }
    }

    match provider.identity_shape {
        IdentityShape::Flat => String::new(),
        IdentityShape::NotionBot => {
            // Service-account tokens nest the owner: {bot: {owner: {user: ...}}}
            let user = &userinfo["bot"]["owner"]["user"];
            if let Some(name) = user.get("name").and_then(Value::as_str) {
                return name.to_string();
            }
            user["person"]["email"]
                .as_str()
                .unwrap_or_default()
                .to_string()
        }
    }
}

/// Extracts the remote account id (`id` or `sub`), stringifying numeric ids.
pub fn extract_account_id(userinfo: &Value) -> String {
    for key in ["id", "sub"] {
        match userinfo.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProviderDescriptor;
    use serde_json::json;

    fn test_provider(server_url: &str, env_prefix: &str) -> ProviderDescriptor {
        ProviderDescriptor::new("testapp", "Test App", "", "Other", "")
            .oauth(
                &format!("{}/authorize", server_url),
                &format!("{}/token", server_url),
            )
            .scopes(&["read", "write"])
            .client_env(
                &format!("{}_CLIENT_ID", env_prefix),
                &format!("{}_CLIENT_SECRET", env_prefix),
            )
            .userinfo(&format!("{}/userinfo", server_url))
    }

    fn set_env(prefix: &str) {
        std::env::set_var(format!("{}_CLIENT_ID", prefix), "test_client");
        std::env::set_var(format!("{}_CLIENT_SECRET", prefix), "test_secret");
    }

    #[test]
    fn test_authorization_url_contents() {
        set_env("OAUTH_URL_TEST");
        let provider = test_provider("https://example.com", "OAUTH_URL_TEST")
            .extra_auth_params(&[("access_type", "offline")]);

        let client = OAuthClient::new();
        let url = client
            .authorization_url(&provider, "state_abc", "http://localhost:8000/callback")
            .unwrap();

        assert!(url.starts_with("https://example.com/authorize?"));
        assert!(url.contains("client_id=test_client"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fcallback"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("state=state_abc"));
        assert!(url.contains("scope=read%20write"));
        assert!(url.contains("access_type=offline"));
    }

    #[test]
    fn test_authorization_url_omits_empty_scope() {
        set_env("OAUTH_NOSCOPE_TEST");
        let provider = ProviderDescriptor::new("noscope", "No Scope", "", "Other", "")
            .oauth("https://example.com/auth", "https://example.com/token")
            .client_env("OAUTH_NOSCOPE_TEST_CLIENT_ID", "OAUTH_NOSCOPE_TEST_CLIENT_SECRET");

        let client = OAuthClient::new();
        let url = client
            .authorization_url(&provider, "s", "http://localhost/cb")
            .unwrap();
        assert!(!url.contains("scope="));
    }

    #[test]
    fn test_authorization_url_rejects_non_oauth_provider() {
        let provider = ProviderDescriptor::new("nooauth", "No OAuth", "", "Other", "");
        let client = OAuthClient::new();
        let err = client
            .authorization_url(&provider, "s", "http://localhost/cb")
            .unwrap_err();
        assert!(matches!(err, ConnectError::UnsupportedProvider(_)));
    }

    #[test]
    fn test_missing_env_is_misconfiguration() {
        let provider = ProviderDescriptor::new("unset", "Unset", "", "Other", "")
            .oauth("https://example.com/auth", "https://example.com/token")
            .client_env("OAUTH_UNSET_CLIENT_ID", "OAUTH_UNSET_CLIENT_SECRET");
        std::env::remove_var("OAUTH_UNSET_CLIENT_ID");
        std::env::remove_var("OAUTH_UNSET_CLIENT_SECRET");

        let err = client_credentials(&provider).unwrap_err();
        assert!(matches!(err, ConnectError::MisconfiguredProvider { .. }));
    }

    #[tokio::test]
    async fn test_exchange_code_body_auth() {
        let mut server = mockito::Server::new_async().await;
        set_env("OAUTH_EXCHANGE_TEST");
        let provider = test_provider(&server.url(), "OAUTH_EXCHANGE_TEST");

        let mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                mockito::Matcher::UrlEncoded("code".into(), "the_code".into()),
                mockito::Matcher::UrlEncoded("client_id".into(), "test_client".into()),
                mockito::Matcher::UrlEncoded("client_secret".into(), "test_secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at_123","refresh_token":"rt_456","expires_in":3600}"#)
            .create_async()
            .await;

        let client = OAuthClient::new();
        let tokens = client
            .exchange_code(&provider, "the_code", "http://localhost/cb")
            .await
            .unwrap();

        assert_eq!(tokens.access_token, "at_123");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt_456"));
        assert_eq!(tokens.expires_in, Some(3600));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_code_basic_auth_header() {
        let mut server = mockito::Server::new_async().await;
        set_env("OAUTH_BASIC_TEST");
        let provider = test_provider(&server.url(), "OAUTH_BASIC_TEST")
            .token_auth(TokenAuthStyle::BasicHeader);

        // base64("test_client:test_secret")
        let expected = BASE64.encode("test_client:test_secret");
        let mock = server
            .mock("POST", "/token")
            .match_header("authorization", format!("Basic {}", expected).as_str())
            .match_body(mockito::Matcher::UrlEncoded(
                "grant_type".into(),
                "authorization_code".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token":"at_n","workspace_id":"ws_1","workspace_name":"Acme"}"#,
            )
            .create_async()
            .await;

        let client = OAuthClient::new();
        let tokens = client
            .exchange_code(&provider, "code", "http://localhost/cb")
            .await
            .unwrap();

        assert_eq!(tokens.access_token, "at_n");
        assert_eq!(tokens.workspace_id.as_deref(), Some("ws_1"));
        assert_eq!(tokens.workspace_name.as_deref(), Some("Acme"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_code_non_2xx() {
        let mut server = mockito::Server::new_async().await;
        set_env("OAUTH_EXFAIL_TEST");
        let provider = test_provider(&server.url(), "OAUTH_EXFAIL_TEST");

        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let client = OAuthClient::new();
        let err = client
            .exchange_code(&provider, "stale", "http://localhost/cb")
            .await
            .unwrap_err();

        match err {
            ConnectError::TokenExchangeFailed { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("expected TokenExchangeFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_access_token() {
        let mut server = mockito::Server::new_async().await;
        set_env("OAUTH_REFRESH_TEST");
        let provider = test_provider(&server.url(), "OAUTH_REFRESH_TEST");

        let mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("refresh_token".into(), "rt_old".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at_new","refresh_token":"rt_new"}"#)
            .create_async()
            .await;

        let client = OAuthClient::new();
        let tokens = client
            .refresh_access_token(&provider, "rt_old")
            .await
            .unwrap();
        assert_eq!(tokens.access_token, "at_new");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt_new"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_failure_is_refresh_failed() {
        let mut server = mockito::Server::new_async().await;
        set_env("OAUTH_REFAIL_TEST");
        let provider = test_provider(&server.url(), "OAUTH_REFAIL_TEST");

        server
            .mock("POST", "/token")
            .with_status(401)
            .with_body("revoked")
            .create_async()
            .await;

        let client = OAuthClient::new();
        let err = client
            .refresh_access_token(&provider, "rt")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectError::RefreshFailed { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_fetch_user_info_sends_extra_headers() {
        let mut server = mockito::Server::new_async().await;
        set_env("OAUTH_USERINFO_TEST");
        let provider = test_provider(&server.url(), "OAUTH_USERINFO_TEST")
            .userinfo_header("Notion-Version", "2022-06-28");

        let mock = server
            .mock("GET", "/userinfo")
            .match_header("authorization", "Bearer at_1")
            .match_header("notion-version", "2022-06-28")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"Ada Lovelace","id":"u_1"}"#)
            .create_async()
            .await;

        let client = OAuthClient::new();
        let info = client.fetch_user_info(&provider, "at_1").await.unwrap();
        assert_eq!(info["name"], "Ada Lovelace");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_user_info_without_endpoint_is_empty() {
        let provider = ProviderDescriptor::new("blind", "Blind", "", "Other", "")
            .oauth("https://example.com/auth", "https://example.com/token");
        let client = OAuthClient::new();
        let info = client.fetch_user_info(&provider, "at").await.unwrap();
        assert_eq!(info, json!({}));
    }

    #[tokio::test]
    async fn test_check_health_classification() {
        let mut server = mockito::Server::new_async().await;
        set_env("OAUTH_HEALTH_TEST");
        let provider = test_provider(&server.url(), "OAUTH_HEALTH_TEST");
        let client = OAuthClient::new();

        let ok = server
            .mock("GET", "/userinfo")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;
        let (healthy, msg) = client.check_health(&provider, "at").await;
        assert!(healthy);
        assert_eq!(msg, "Connected");
        ok.remove_async().await;

        let unauthorized = server
            .mock("GET", "/userinfo")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let (healthy, msg) = client.check_health(&provider, "at").await;
        assert!(!healthy);
        assert_eq!(msg, "token expired or revoked");
        unauthorized.remove_async().await;

        server
            .mock("GET", "/userinfo")
            .with_status(503)
            .create_async()
            .await;
        let (healthy, msg) = client.check_health(&provider, "at").await;
        assert!(!healthy);
        assert_eq!(msg, "HTTP 503");
    }

    #[tokio::test]
    async fn test_check_health_optimistic_without_endpoint() {
        let provider = ProviderDescriptor::new("blind", "Blind", "", "Other", "")
            .oauth("https://example.com/auth", "https://example.com/token");
        let client = OAuthClient::new();
        let (healthy, msg) = client.check_health(&provider, "at").await;
        assert!(healthy);
        assert_eq!(msg, "no health check available");
    }

    #[test]
    fn test_extract_account_name_flat() {
        let provider = ProviderDescriptor::new("flat", "Flat", "", "Other", "");
        assert_eq!(
            extract_account_name(&provider, &json!({"email": "a@b.c", "name": "A"})),
            "a@b.c"
        );
        assert_eq!(
            extract_account_name(&provider, &json!({"login": "octocat"})),
            "octocat"
        );
        assert_eq!(extract_account_name(&provider, &json!({})), "");
    }

    #[test]
    fn test_extract_account_name_notion_bot_nesting() {
        let provider = ProviderDescriptor::new("n", "N", "", "Other", "")
            .identity_shape(IdentityShape::NotionBot);

        let info = json!({"bot": {"owner": {"user": {"name": "Workspace Owner"}}}});
        assert_eq!(extract_account_name(&provider, &info), "Workspace Owner");

        let info = json!({"bot": {"owner": {"user": {"person": {"email": "o@w.io"}}}}});
        assert_eq!(extract_account_name(&provider, &info), "o@w.io");
    }

    #[test]
    fn test_extract_account_id() {
        assert_eq!(extract_account_id(&json!({"id": "u_1"})), "u_1");
        assert_eq!(extract_account_id(&json!({"id": 42})), "42");
        assert_eq!(extract_account_id(&json!({"sub": "s_9"})), "s_9");
        assert_eq!(extract_account_id(&json!({})), "");
    }
}
