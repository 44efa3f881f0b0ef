//! Third-party credential persistence
//!
//! The credential is persisted as two entries, `oauth2_token` and
//! `oauth2_provider`, which are written and cleared together. A half-present
//! pair (left behind by an interrupted write or an external edit) reads as
//! "no credential".

use async_trait::async_trait;
use gametout_domain::constants::{PROVIDER_STORAGE_KEY, TOKEN_STORAGE_KEY};
use gametout_domain::{GameToutError, Provider, ThirdPartyCredential};
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(feature = "platform")]
use crate::security::KeychainProvider;
use crate::security::{KeychainError, MemorySecretStore, SecretStore};

/// Credential store error types
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing secret store rejected the operation
    #[error("Credential storage unavailable: {0}")]
    Backend(#[from] KeychainError),
}

impl From<StoreError> for GameToutError {
    fn from(err: StoreError) -> Self {
        Self::Security(err.to_string())
    }
}

/// Persistence for the single third-party credential of this client.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// The stored credential, or `None` if either half is missing.
    ///
    /// # Errors
    /// Returns `StoreError` if the backend cannot be read
    async fn get(&self) -> Result<Option<ThirdPartyCredential>, StoreError>;

    /// Persist both halves of `credential`, replacing any previous one.
    ///
    /// # Errors
    /// Returns `StoreError` if either half cannot be written
    async fn store(&self, credential: &ThirdPartyCredential) -> Result<(), StoreError>;

    /// Remove both halves. Clearing an empty store succeeds.
    ///
    /// # Errors
    /// Returns `StoreError` if the backend rejects a delete
    async fn clear(&self) -> Result<(), StoreError>;

    /// The stored provider, if a complete credential is present.
    ///
    /// # Errors
    /// Returns `StoreError` if the backend cannot be read
    async fn provider(&self) -> Result<Option<Provider>, StoreError> {
        Ok(self.get().await?.map(|credential| credential.provider))
    }
}

/// [`CredentialStore`] over any [`SecretStore`] backend
#[derive(Debug, Clone)]
pub struct SecretCredentialStore<S> {
    secrets: S,
}

/// Credential store kept in process memory
pub type MemoryCredentialStore = SecretCredentialStore<MemorySecretStore>;

/// Credential store persisted in the platform keychain
#[cfg(feature = "platform")]
pub type KeychainCredentialStore = SecretCredentialStore<KeychainProvider>;

impl<S: SecretStore> SecretCredentialStore<S> {
    pub fn new(secrets: S) -> Self {
        Self { secrets }
    }

    /// The underlying backend.
    pub fn secrets(&self) -> &S {
        &self.secrets
    }

    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.secrets.get_secret(key) {
            Ok(value) => Ok(Some(value)),
            Err(KeychainError::NotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl MemoryCredentialStore {
    /// Empty in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemorySecretStore::new())
    }
}

#[cfg(feature = "platform")]
impl KeychainCredentialStore {
    /// Store under the given keychain service name.
    pub fn for_service(service_name: impl Into<String>) -> Self {
        Self::new(KeychainProvider::new(service_name))
    }
}

#[async_trait]
impl<S: SecretStore> CredentialStore for SecretCredentialStore<S> {
    async fn get(&self) -> Result<Option<ThirdPartyCredential>, StoreError> {
        let token = self.read(TOKEN_STORAGE_KEY)?;
        let provider = self.read(PROVIDER_STORAGE_KEY)?;

        match (token, provider) {
            (Some(token), Some(provider)) => match provider.parse::<Provider>() {
                Ok(provider) => Ok(Some(ThirdPartyCredential::new(token, provider))),
                Err(err) => {
                    warn!(error = %err, "Stored provider is not recognized; ignoring credential");
                    Ok(None)
                }
            },
            (None, None) => Ok(None),
            (token, provider) => {
                warn!(
                    has_token = token.is_some(),
                    has_provider = provider.is_some(),
                    "Half-present credential pair; treating as signed out"
                );
                Ok(None)
            }
        }
    }

    async fn store(&self, credential: &ThirdPartyCredential) -> Result<(), StoreError> {
        self.secrets.set_secret(TOKEN_STORAGE_KEY, &credential.token)?;
        if let Err(err) = self.secrets.set_secret(PROVIDER_STORAGE_KEY, credential.provider.as_str()) {
            // Never leave a token behind without its provider.
            if let Err(rollback) = self.secrets.delete_secret(TOKEN_STORAGE_KEY) {
                warn!(
                    error = %rollback,
                    "Failed to roll back token after provider write failed; pair is half-present"
                );
            }
            return Err(err.into());
        }

        debug!(provider = %credential.provider, "Third-party credential stored");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let token = self.secrets.delete_secret(TOKEN_STORAGE_KEY);
        let provider = self.secrets.delete_secret(PROVIDER_STORAGE_KEY);
        token?;
        provider?;

        debug!("Third-party credential cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Secret backend that rejects provider writes and, optionally, deletes.
    #[derive(Clone, Default)]
    struct RejectingSecretStore {
        inner: MemorySecretStore,
        reject_deletes: bool,
    }

    impl SecretStore for RejectingSecretStore {
        fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
            if key == PROVIDER_STORAGE_KEY {
                return Err(KeychainError::AccessFailed("provider write denied".into()));
            }
            self.inner.set_secret(key, value)
        }

        fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
            self.inner.get_secret(key)
        }

        fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
            if self.reject_deletes {
                return Err(KeychainError::AccessFailed("delete denied".into()));
            }
            self.inner.delete_secret(key)
        }
    }

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let store = MemoryCredentialStore::in_memory();
        let credential = ThirdPartyCredential::new("abc", Provider::Discord);

        store.store(&credential).await.unwrap();

        assert_eq!(store.get().await.unwrap(), Some(credential));
        assert_eq!(store.provider().await.unwrap(), Some(Provider::Discord));
        assert_eq!(store.secrets().get_secret(PROVIDER_STORAGE_KEY).unwrap(), "discord");
    }

    #[tokio::test]
    async fn token_without_provider_reads_as_none() {
        let secrets = MemorySecretStore::new().with_entry(TOKEN_STORAGE_KEY, "abc");
        let store = SecretCredentialStore::new(secrets);

        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn provider_without_token_reads_as_none() {
        let secrets = MemorySecretStore::new().with_entry(PROVIDER_STORAGE_KEY, "steam");
        let store = SecretCredentialStore::new(secrets);

        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_stored_provider_reads_as_none() {
        let secrets = MemorySecretStore::new()
            .with_entry(TOKEN_STORAGE_KEY, "abc")
            .with_entry(PROVIDER_STORAGE_KEY, "myspace");
        let store = SecretCredentialStore::new(secrets);

        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_removes_only_the_pair() {
        let secrets = MemorySecretStore::new().with_entry("session_theme", "dark");
        let store = SecretCredentialStore::new(secrets.clone());
        store.store(&ThirdPartyCredential::new("abc", Provider::LinkedIn)).await.unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.get().await.unwrap(), None);
        assert_eq!(secrets.keys(), vec!["session_theme".to_string()]);
    }

    #[test]
    fn store_error_maps_to_security_error() {
        let err: GameToutError = StoreError::from(KeychainError::AccessFailed("locked".into())).into();
        assert!(matches!(err, GameToutError::Security(msg) if msg.contains("locked")));
    }

    #[tokio::test]
    async fn failed_provider_write_rolls_back_token() {
        let secrets = RejectingSecretStore::default();
        let store = SecretCredentialStore::new(secrets.clone());

        let err = store.store(&ThirdPartyCredential::new("abc", Provider::Steam)).await.unwrap_err();

        assert!(err.to_string().contains("provider write denied"));
        assert!(secrets.inner.is_empty());
    }

    #[tokio::test]
    async fn failed_rollback_still_reports_original_error() {
        let secrets = RejectingSecretStore { reject_deletes: true, ..Default::default() };
        let store = SecretCredentialStore::new(secrets.clone());

        let err = store.store(&ThirdPartyCredential::new("abc", Provider::Steam)).await.unwrap_err();

        assert!(err.to_string().contains("provider write denied"));
        // The stranded token is never surfaced as a credential.
        assert_eq!(secrets.inner.keys(), vec![TOKEN_STORAGE_KEY.to_string()]);
        assert_eq!(store.get().await.unwrap(), None);
    }
}
