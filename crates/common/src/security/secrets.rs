//! Key/value secret backends

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// Minimal key/value contract shared by every secret backend.
///
/// Implementations are synchronous; the platform keychain APIs are blocking
/// and fast enough to call from async contexts directly.
pub trait SecretStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backend rejects the write
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError>;

    /// Read the value stored under `key`.
    ///
    /// # Errors
    /// Returns `KeychainError::NotFound` if nothing is stored under `key`
    fn get_secret(&self, key: &str) -> Result<String, KeychainError>;

    /// Remove the value stored under `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backend rejects the delete
    fn delete_secret(&self, key: &str) -> Result<(), KeychainError>;

    fn secret_exists(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }
}

/// Secret backend error types
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Backend access failed (permission denied, not available, etc.)
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    /// Entry not found
    #[error("Entry not found")]
    NotFound,
}

#[cfg(feature = "platform")]
impl From<keyring::Error> for KeychainError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoEntry => Self::NotFound,
            other => Self::AccessFailed(other.to_string()),
        }
    }
}

/// Process-local secret backend.
///
/// Clones share the same map, so a test can keep a handle and inspect what
/// the credential store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry, e.g. unrelated state that must survive a logout.
    #[must_use]
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.lock().insert(key.into(), value.into());
        self
    }

    /// Snapshot of the keys currently stored.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl SecretStore for MemorySecretStore {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        self.entries.lock().get(key).cloned().ok_or(KeychainError::NotFound)
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn secret_exists(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }
}
