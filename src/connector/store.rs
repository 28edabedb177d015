//! SQLite persistence for connectors.
//!
//! Credentials are sealed with AES-256-GCM before they touch the database;
//! the plaintext bundle exists only inside the accessors here. Status
//! updates issued by background work are guarded so a disconnected
//! connector can never be resurrected.

use super::encryption;
use super::{AuthMethod, ConnectionStatus, Connector, CredentialBundle};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde_json::json;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Bundle serialization format version. Bumped if the stored shape changes.
const BUNDLE_VERSION: u32 = 1;

/// Thread-safe connector store.
///
/// Wraps a single SQLite connection in a mutex; lifecycle traffic is low
/// enough that serialized access is the simple and correct choice.
pub struct ConnectorStore {
    conn: Mutex<Connection>,
    key: Vec<u8>,
}

impl ConnectorStore {
    /// Opens (or creates) the database at `path` and runs schema setup.
    ///
    /// `key` is the 32-byte credential encryption key, already validated.
    pub fn new<P: AsRef<Path>>(path: P, key: Vec<u8>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", path.as_ref()))?;
        let store = Self {
            conn: Mutex::new(conn),
            key,
        };
        store.init_schema()?;
        info!(path = ?path.as_ref(), "connector store ready");
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS connectors (
                id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL,
                app_name TEXT NOT NULL,
                display_name TEXT NOT NULL,
                credentials TEXT NOT NULL,
                auth_method TEXT NOT NULL,
                connection_status TEXT NOT NULL,
                status_message TEXT,
                external_account_id TEXT,
                external_account_name TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                token_expires_at TEXT,
                last_health_check_at TEXT,
                last_synced_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_connectors_customer
                ON connectors(customer_id);",
        )
        .context("Failed to create connectors schema")?;
        Ok(())
    }

    fn seal_bundle(&self, bundle: &CredentialBundle) -> Result<String> {
        let doc = json!({ "v": BUNDLE_VERSION, "data": bundle });
        encryption::seal(&doc.to_string(), &self.key)
    }

    fn open_bundle(&self, blob: &str) -> Result<CredentialBundle> {
        let plaintext = encryption::open(blob, &self.key)?;
        let doc: serde_json::Value =
            serde_json::from_str(&plaintext).context("Credential bundle is not valid JSON")?;
        let version = doc["v"].as_u64().unwrap_or(0) as u32;
        if version != BUNDLE_VERSION {
            return Err(anyhow!("Unsupported credential bundle version {}", version));
        }
        serde_json::from_value(doc["data"].clone())
            .context("Credential bundle payload has unexpected shape")
    }

    /// Persists a new connector.
    pub fn insert(&self, connector: &Connector) -> Result<()> {
        let credentials = self.seal_bundle(&connector.credentials)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO connectors (
                id, customer_id, app_name, display_name, credentials,
                auth_method, connection_status, status_message,
                external_account_id, external_account_name, is_active,
                token_expires_at, last_health_check_at, last_synced_at,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                connector.id.to_string(),
                connector.customer_id.to_string(),
                connector.app_name,
                connector.display_name,
                credentials,
                connector.auth_method.as_str(),
                connector.connection_status.as_str(),
                connector.status_message,
                connector.external_account_id,
                connector.external_account_name,
                connector.is_active as i64,
                connector.token_expires_at.map(|t| t.to_rfc3339()),
                connector.last_health_check_at.map(|t| t.to_rfc3339()),
                connector.last_synced_at.map(|t| t.to_rfc3339()),
                connector.created_at.to_rfc3339(),
                connector.updated_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert connector")?;
        debug!(connector = %connector.app_name, id = %connector.id, "connector stored");
        Ok(())
    }

    /// Fetches a connector scoped to its owning customer.
    pub fn get(&self, id: Uuid, customer_id: Uuid) -> Result<Option<Connector>> {
        self.query_one(
            "SELECT * FROM connectors WHERE id = ?1 AND customer_id = ?2",
            params![id.to_string(), customer_id.to_string()],
        )
    }

    /// Fetches a connector by id alone. Background use only.
    pub fn get_by_id(&self, id: Uuid) -> Result<Option<Connector>> {
        self.query_one(
            "SELECT * FROM connectors WHERE id = ?1",
            params![id.to_string()],
        )
    }

    /// All connectors for a customer, newest first.
    pub fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Connector>> {
        self.query_many(
            "SELECT * FROM connectors WHERE customer_id = ?1 ORDER BY created_at DESC",
            params![customer_id.to_string()],
        )
    }

    /// The sweep population: active OAuth connectors that are not
    /// disconnected.
    pub fn list_active_oauth(&self) -> Result<Vec<Connector>> {
        self.query_many(
            "SELECT * FROM connectors
             WHERE auth_method = 'oauth'
               AND is_active = 1
               AND connection_status != 'disconnected'",
            params![],
        )
    }

    /// Writes a health verdict and stamps `last_health_check_at`. A healthy
    /// verdict clears the message by passing `None`.
    ///
    /// Guarded: returns false without writing if the connector was
    /// disconnected or deactivated since it was loaded.
    pub fn record_health(
        &self,
        id: Uuid,
        status: ConnectionStatus,
        message: Option<&str>,
    ) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE connectors
                 SET connection_status = ?1, status_message = ?2,
                     last_health_check_at = ?3, updated_at = ?3
                 WHERE id = ?4
                   AND connection_status != 'disconnected'
                   AND is_active = 1",
                params![status.as_str(), message, now, id.to_string()],
            )
            .context("Failed to record health")?;
        Ok(changed > 0)
    }

    /// Replaces the credential bundle after a token refresh.
    ///
    /// Guarded like [`record_health`]: a disconnect that lands mid-refresh
    /// wins and the new tokens are dropped.
    pub fn store_refreshed_tokens(
        &self,
        id: Uuid,
        bundle: &CredentialBundle,
        token_expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let credentials = self.seal_bundle(bundle)?;
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE connectors
                 SET credentials = ?1, token_expires_at = ?2, updated_at = ?3
                 WHERE id = ?4
                   AND connection_status != 'disconnected'
                   AND is_active = 1",
                params![
                    credentials,
                    token_expires_at.map(|t| t.to_rfc3339()),
                    now,
                    id.to_string()
                ],
            )
            .context("Failed to store refreshed tokens")?;
        Ok(changed > 0)
    }

    /// Stamps a successful sync. Guarded against disconnect races.
    pub fn mark_synced(&self, id: Uuid) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE connectors
                 SET last_synced_at = ?1, updated_at = ?1
                 WHERE id = ?2
                   AND connection_status != 'disconnected'
                   AND is_active = 1",
                params![now, id.to_string()],
            )
            .context("Failed to mark connector synced")?;
        Ok(changed > 0)
    }

    /// Terminal disconnect: wipes credentials, deactivates, and marks the
    /// connector disconnected. Unguarded and idempotent; user intent always
    /// wins.
    pub fn disconnect(&self, id: Uuid, customer_id: Uuid) -> Result<bool> {
        let empty = self.seal_bundle(&CredentialBundle::new())?;
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE connectors
                 SET credentials = ?1, connection_status = 'disconnected',
                     status_message = 'Disconnected by user', is_active = 0,
                     updated_at = ?2
                 WHERE id = ?3 AND customer_id = ?4",
                params![empty, now, id.to_string(), customer_id.to_string()],
            )
            .context("Failed to disconnect connector")?;
        if changed > 0 {
            info!(id = %id, "connector disconnected");
        }
        Ok(changed > 0)
    }

    /// Removes a connector record entirely.
    pub fn delete(&self, id: Uuid, customer_id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "DELETE FROM connectors WHERE id = ?1 AND customer_id = ?2",
                params![id.to_string(), customer_id.to_string()],
            )
            .context("Failed to delete connector")?;
        Ok(changed > 0)
    }

    /// Removes every connector owned by a customer. Returns the count.
    pub fn delete_for_customer(&self, customer_id: Uuid) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "DELETE FROM connectors WHERE customer_id = ?1",
                params![customer_id.to_string()],
            )
            .context("Failed to delete customer connectors")?;
        Ok(changed)
    }

    fn query_one(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Option<Connector>> {
        let rows = self.load_rows(sql, params)?;
        match rows.into_iter().next() {
            Some(raw) => Ok(Some(self.hydrate(raw)?)),
            None => Ok(None),
        }
    }

    fn query_many(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Connector>> {
        self.load_rows(sql, params)?
            .into_iter()
            .map(|raw| self.hydrate(raw))
            .collect()
    }

    fn load_rows(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<RawRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql).context("Failed to prepare query")?;
        let rows = stmt
            .query_map(params, |row| {
                Ok(RawRow {
                    id: row.get("id")?,
                    customer_id: row.get("customer_id")?,
                    app_name: row.get("app_name")?,
                    display_name: row.get("display_name")?,
                    credentials: row.get("credentials")?,
                    auth_method: row.get("auth_method")?,
                    connection_status: row.get("connection_status")?,
                    status_message: row.get("status_message")?,
                    external_account_id: row.get("external_account_id")?,
                    external_account_name: row.get("external_account_name")?,
                    is_active: row.get("is_active")?,
                    token_expires_at: row.get("token_expires_at")?,
                    last_health_check_at: row.get("last_health_check_at")?,
                    last_synced_at: row.get("last_synced_at")?,
                    created_at: row.get("created_at")?,
                    updated_at: row.get("updated_at")?,
                })
            })
            .context("Failed to query connectors")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read connector rows")?;
        Ok(rows)
    }

    fn hydrate(&self, raw: RawRow) -> Result<Connector> {
        Ok(Connector {
            id: raw.id.parse().context("Invalid connector id in database")?,
            customer_id: raw
                .customer_id
                .parse()
                .context("Invalid customer id in database")?,
            app_name: raw.app_name,
            display_name: raw.display_name,
            credentials: self.open_bundle(&raw.credentials)?,
            auth_method: AuthMethod::parse(&raw.auth_method)
                .ok_or_else(|| anyhow!("Unknown auth method: {}", raw.auth_method))?,
            connection_status: ConnectionStatus::parse(&raw.connection_status)
                .ok_or_else(|| anyhow!("Unknown connection status: {}", raw.connection_status))?,
            status_message: raw.status_message,
            external_account_id: raw.external_account_id,
            external_account_name: raw.external_account_name,
            is_active: raw.is_active != 0,
            token_expires_at: parse_timestamp(raw.token_expires_at)?,
            last_health_check_at: parse_timestamp(raw.last_health_check_at)?,
            last_synced_at: parse_timestamp(raw.last_synced_at)?,
            created_at: parse_timestamp(Some(raw.created_at))?
                .ok_or_else(|| anyhow!("Missing created_at"))?,
            updated_at: parse_timestamp(Some(raw.updated_at))?
                .ok_or_else(|| anyhow!("Missing updated_at"))?,
        })
    }
}

struct RawRow {
    id: String,
    customer_id: String,
    app_name: String,
    display_name: String,
    credentials: String,
    auth_method: String,
    connection_status: String,
    status_message: Option<String>,
    external_account_id: Option<String>,
    external_account_name: Option<String>,
    is_active: i64,
    token_expires_at: Option<String>,
    last_health_check_at: Option<String>,
    last_synced_at: Option<String>,
    created_at: String,
    updated_at: String,
}

fn parse_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(s) => {
            let parsed = DateTime::parse_from_rfc3339(&s)
                .with_context(|| format!("Invalid timestamp in database: {}", s))?;
            Ok(Some(parsed.with_timezone(&Utc)))
        }
        None => Ok(None),
    }
}
