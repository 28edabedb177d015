//! CSRF state store for the OAuth handshake.
//!
//! A state token is valid for exactly one `consume` call within the TTL.
//! The store is in-memory only: an interrupted handshake is retried from
//! scratch, which is the correct failure mode for a CSRF-bound flow.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Bytes of entropy per state token (256 bits).
const TOKEN_BYTES: usize = 32;

/// One pending authorization attempt.
#[derive(Clone, Debug)]
pub struct StateEntry {
    pub customer_id: String,
    pub provider_id: String,
    pub created_at: DateTime<Utc>,
}

/// Single-use CSRF token store, shared process-wide.
///
/// `create` and `consume` are safe under concurrent invocation; the map
/// mutation is serialized behind a mutex and removal-on-consume guarantees
/// at-most-once redemption even when a browser double-fires the callback.
#[derive(Clone)]
pub struct StateStore {
    entries: Arc<Mutex<HashMap<String, StateEntry>>>,
    ttl: Duration,
}

impl StateStore {
    /// `ttl_seconds` is how long a token stays redeemable (design value: 600).
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// Generates and stores a new state token for a (customer, provider)
    /// pair. Sweeps expired entries first to bound memory.
    pub fn create(&self, customer_id: &str, provider_id: &str) -> String {
        let mut buf = [0u8; TOKEN_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut buf);
        let token = URL_SAFE_NO_PAD.encode(buf);

        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, e| now - e.created_at <= self.ttl);
        entries.insert(
            token.clone(),
            StateEntry {
                customer_id: customer_id.to_string(),
                provider_id: provider_id.to_string(),
                created_at: now,
            },
        );

        token
    }

    /// Atomically removes and returns the entry if present and unexpired.
    ///
    /// Expired entries are discarded, not returned. After this call the
    /// token is unreachable either way.
    pub fn consume(&self, token: &str) -> Option<StateEntry> {
        let entry = self.entries.lock().unwrap().remove(token)?;
        if Utc::now() - entry.created_at > self.ttl {
            return None;
        }
        Some(entry)
    }

    /// Number of pending entries, for monitoring.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
