//! OAuth 2.0 authorization flow for external provider connections.
//!
//! The authorization code flow:
//! 1. User picks a provider, the service builds an authorization URL
//! 2. A CSRF state token binds the attempt to a (customer, provider) pair
//! 3. Provider redirects back with code + state
//! 4. State is consumed (single-use), code is exchanged for tokens
//! 5. Account identity is fetched best-effort and a connector is created
//!
//! Token refresh and health probing reuse the same orchestrator from the
//! background sweeper.

mod client;
mod state;

pub use client::{extract_account_id, extract_account_name, OAuthClient, TokenResponse};
pub use state::{StateEntry, StateStore};
