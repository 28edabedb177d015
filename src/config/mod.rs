use anyhow::{Context, Result};
use serde::Deserialize;

/// Complete Tether configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TetherConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub urls: UrlConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "connectors.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlConfig {
    /// Public base of this service, used to build the OAuth callback URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Admin UI base, destination of callback redirects
    #[serde(default = "default_admin_url")]
    pub admin_url: String,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_admin_url() -> String {
    "http://localhost:3000/admin".to_string()
}

impl UrlConfig {
    pub fn callback_url(&self) -> String {
        format!(
            "{}/api/connectors/oauth/callback",
            self.api_base_url.trim_end_matches('/')
        )
    }
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            admin_url: default_admin_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    /// How long a CSRF state token stays redeemable (seconds)
    #[serde(default = "default_state_ttl")]
    pub state_ttl_seconds: i64,
    #[serde(default = "default_token_timeout")]
    pub token_timeout_seconds: u64,
    #[serde(default = "default_userinfo_timeout")]
    pub userinfo_timeout_seconds: u64,
}

fn default_state_ttl() -> i64 {
    600
}

fn default_token_timeout() -> u64 {
    30
}

fn default_userinfo_timeout() -> u64 {
    15
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            state_ttl_seconds: default_state_ttl(),
            token_timeout_seconds: default_token_timeout(),
            userinfo_timeout_seconds: default_userinfo_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Seconds between health sweeps
    #[serde(default = "default_sweep_interval")]
    pub interval_seconds: u64,
}

fn default_sweep_interval() -> u64 {
    300
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_sweep_interval(),
        }
    }
}

impl Default for TetherConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            urls: UrlConfig::default(),
            oauth: OAuthConfig::default(),
            sweeper: SweeperConfig::default(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<TetherConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: TetherConfig =
        toml::from_str(&contents).with_context(|| format!("Invalid config file {}", path))?;
    Ok(config)
}
