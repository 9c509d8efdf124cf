//! Stable per-client session identity.
//!
//! A [`SessionIdentityProvider`] reads a namespaced key from a
//! [`KeyValueStore`] and creates the identifier on first use. The identifier is
//! never rewritten; it only goes away through
//! [`SessionIdentityProvider::clear_session_id`].
//!
//! When the store cannot be used (read-only disk, sandboxed client) the
//! [`StorageFallback`] policy decides between degrading to a process-local
//! identifier and failing the caller.

mod store;

pub use store::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};

use std::fmt;

use metrics::counter;
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{LeadCaptureError, Result};

/// Default key the identifier is stored under.
pub const DEFAULT_SESSION_KEY: &str = "leadcapture.session_id";

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 9;

/// Opaque identifier correlating submissions from one client.
///
/// Always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier: a millisecond timestamp plus a random suffix.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| SUFFIX_CHARSET[rng.random_range(0..SUFFIX_CHARSET.len())] as char)
            .collect();
        SessionId(format!(
            "session_{}_{}",
            chrono::Utc::now().timestamp_millis(),
            suffix
        ))
    }

    /// Wrap an existing value, rejecting empty or whitespace-only strings.
    pub fn parse(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(SessionId(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        SessionId::parse(value).ok_or_else(|| "session id must not be empty".to_string())
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// What to do when the key-value store is unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFallback {
    /// Keep a process-local identifier and log a warning
    #[default]
    Memory,
    /// Surface the storage error to the caller
    Fail,
}

/// Configuration for the session identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Namespaced key the identifier is stored under
    pub storage_key: String,
    /// Policy applied when the store fails
    pub fallback: StorageFallback,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_SESSION_KEY.to_string(),
            fallback: StorageFallback::default(),
        }
    }
}

/// Hands out the session identifier, creating it on demand.
pub struct SessionIdentityProvider<K: KeyValueStore> {
    store: K,
    config: SessionConfig,
    /// Identifier used while the store is unavailable under `StorageFallback::Memory`
    degraded: Mutex<Option<SessionId>>,
}

impl<K: KeyValueStore> SessionIdentityProvider<K> {
    pub fn new(store: K) -> Self {
        Self::with_config(store, SessionConfig::default())
    }

    pub fn with_config(store: K, config: SessionConfig) -> Self {
        Self {
            store,
            config,
            degraded: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Return the stored identifier, generating and storing one if absent.
    ///
    /// Repeated calls return the same value until [`Self::clear_session_id`].
    pub fn get_or_create_session_id(&self) -> Result<SessionId> {
        let key = self.config.storage_key.as_str();

        let existing = match self.store.get(key) {
            Ok(value) => value.and_then(SessionId::parse),
            Err(e) => return self.degrade(e),
        };
        if let Some(id) = existing {
            return Ok(id);
        }

        // An identifier handed out while storage was failing must survive recovery
        let pending = self.degraded.lock().clone();
        let id = pending.clone().unwrap_or_else(SessionId::generate);
        if let Err(e) = self.store.set(key, id.as_str()) {
            return self.degrade(e);
        }
        if pending.is_some() {
            self.degraded.lock().take();
            tracing::info!(session_id = %id, key, "Session storage recovered, identifier persisted");
        } else {
            counter!("leadcapture_sessions_created_total").increment(1);
            tracing::debug!(session_id = %id, key, "Created session identifier");
        }
        Ok(id)
    }

    /// Forget the identifier so the next read generates a new one.
    pub fn clear_session_id(&self) -> Result<()> {
        self.degraded.lock().take();
        match self.store.remove(&self.config.storage_key) {
            Ok(()) => Ok(()),
            Err(e) if self.config.fallback == StorageFallback::Memory => {
                tracing::warn!(error = %e, "Could not remove session identifier from storage");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn degrade(&self, error: LeadCaptureError) -> Result<SessionId> {
        match self.config.fallback {
            StorageFallback::Fail => {
                tracing::error!(error = %error, "Session storage unavailable");
                Err(match error {
                    LeadCaptureError::SessionStorage(_) => error,
                    other => LeadCaptureError::SessionStorage(other.to_string()),
                })
            }
            StorageFallback::Memory => {
                let mut degraded = self.degraded.lock();
                let id = degraded
                    .get_or_insert_with(|| {
                        counter!("leadcapture_sessions_created_total").increment(1);
                        SessionId::generate()
                    })
                    .clone();
                tracing::warn!(
                    error = %error,
                    session_id = %id,
                    "Session storage unavailable, using in-memory identifier"
                );
                Ok(id)
            }
        }
    }
}
