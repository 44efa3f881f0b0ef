//! Platform keychain backend
//!
//! Thin wrapper over the OS credential vault: macOS Keychain Access,
//! Windows Credential Manager, Linux Secret Service.
//!
//! ## Usage
//!
//! ```no_run
//! use gametout_common::security::{KeychainProvider, SecretStore};
//!
//! let keychain = KeychainProvider::new("GameTout.oauth2");
//! keychain.set_secret("oauth2_provider", "discord")?;
//! assert_eq!(keychain.get_secret("oauth2_provider")?, "discord");
//! # Ok::<(), gametout_common::security::KeychainError>(())
//! ```

use keyring::Entry;
use tracing::debug;

use super::secrets::{KeychainError, SecretStore};

/// Keychain-backed [`SecretStore`] scoped to one service name
#[derive(Debug, Clone)]
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    /// Create a new keychain provider for a specific service
    ///
    /// # Examples
    /// ```
    /// use gametout_common::security::KeychainProvider;
    ///
    /// let keychain = KeychainProvider::new("GameTout.oauth2");
    /// assert_eq!(keychain.service_name(), "GameTout.oauth2");
    /// ```
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn create_entry(&self, key: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to create keychain entry: {}", e))
        })
    }
}

impl SecretStore for KeychainProvider {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");

        let entry = self.create_entry(key)?;
        entry.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to store secret for {}: {}", key, e))
        })?;

        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        debug!(service = %self.service_name, key = %key, "Retrieving secret from keychain");

        let entry = self.create_entry(key)?;
        entry.get_password().map_err(KeychainError::from)
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Deleting secret from keychain");

        let entry = self.create_entry(key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "Failed to delete secret for {}: {}",
                key, e
            ))),
        }
    }
}
