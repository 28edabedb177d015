//! Error taxonomy for the connector lifecycle.
//!
//! Interactive connect failures surface as redirect parameters, sweep and
//! sync failures as per-connector status messages. The variants here keep
//! those paths distinguishable: operator misconfiguration
//! (`MisconfiguredProvider`) is not the same failure as a remote provider
//! rejecting a grant (`TokenExchangeFailed`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectError {
    /// Provider id is not in the catalog at all.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// Provider exists but has no OAuth endpoints. Rejected before any
    /// network call.
    #[error("provider {0} does not support OAuth")]
    UnsupportedProvider(String),

    /// OAuth client credentials are missing from the environment. This is
    /// an operator error, not a remote failure.
    #[error("provider {provider} is not configured: set {client_id_env} and {client_secret_env}")]
    MisconfiguredProvider {
        provider: String,
        client_id_env: String,
        client_secret_env: String,
    },

    /// CSRF state token was missing, unknown, already consumed, or expired.
    #[error("invalid or expired OAuth state")]
    InvalidOrExpiredState,

    /// The provider rejected the authorization-code grant.
    #[error("token exchange failed with status {status}: {body}")]
    TokenExchangeFailed { status: u16, body: String },

    /// The provider rejected the refresh-token grant. Callers interpret
    /// this as "connector needs re-authorization".
    #[error("token refresh failed with status {status}: {body}")]
    RefreshFailed { status: u16, body: String },

    /// The userinfo endpoint returned a non-2xx status.
    #[error("userinfo request failed with HTTP {status}")]
    UserinfoFailed { status: u16 },

    /// A sync adapter was invoked with no usable secret in the bundle.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// Transport-level failure (connection refused, timeout, bad TLS).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConnectError::UnknownProvider("not-a-real-app".to_string());
        assert_eq!(err.to_string(), "unknown provider: not-a-real-app");

        let err = ConnectError::TokenExchangeFailed {
            status: 400,
            body: "invalid_grant".to_string(),
        };
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("invalid_grant"));

        let err = ConnectError::MisconfiguredProvider {
            provider: "notion".to_string(),
            client_id_env: "NOTION_OAUTH_CLIENT_ID".to_string(),
            client_secret_env: "NOTION_OAUTH_CLIENT_SECRET".to_string(),
        };
        assert!(err.to_string().contains("NOTION_OAUTH_CLIENT_ID"));
    }
}
