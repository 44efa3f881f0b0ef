//! High-level login service
//!
//! Combines the handshake coordinator with credential persistence: a
//! successful handshake is stored, logout clears the pair.

use std::sync::Arc;

use gametout_domain::{GameToutError, Provider, ThirdPartyCredential};
use thiserror::Error;
use tracing::{debug, info};

use super::handshake::{HandshakeCoordinator, HandshakeError};
use super::store::{CredentialStore, StoreError};

/// Error type for login service operations
#[derive(Debug, Error)]
pub enum OAuth2ServiceError {
    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OAuth2ServiceError {
    #[must_use]
    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::Handshake(err) if err.is_user_cancelled())
    }
}

impl From<OAuth2ServiceError> for GameToutError {
    fn from(err: OAuth2ServiceError) -> Self {
        match err {
            OAuth2ServiceError::Handshake(HandshakeError::InvalidConfig(msg)) => Self::Config(msg),
            OAuth2ServiceError::Handshake(other) => Self::Auth(other.to_string()),
            OAuth2ServiceError::Store(store) => store.into(),
        }
    }
}

/// What a completed login produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub provider: Provider,
    pub user_id: Option<String>,
    pub new_user: bool,
}

/// OAuth2 login orchestrator
#[derive(Clone)]
pub struct OAuth2LoginService {
    coordinator: Arc<HandshakeCoordinator>,
    store: Arc<dyn CredentialStore>,
}

impl OAuth2LoginService {
    pub fn new(coordinator: Arc<HandshakeCoordinator>, store: Arc<dyn CredentialStore>) -> Self {
        Self { coordinator, store }
    }

    /// Run the popup handshake for `provider` and persist the credential.
    ///
    /// Nothing is written unless the handshake succeeds.
    ///
    /// # Errors
    /// Returns `OAuth2ServiceError::Handshake` if the handshake fails and
    /// `OAuth2ServiceError::Store` if the credential cannot be persisted
    pub async fn login(&self, provider: Provider) -> Result<LoginOutcome, OAuth2ServiceError> {
        let params = self.coordinator.initiate(provider).await?;
        let credential = params.credential().ok_or(HandshakeError::NoTokenReceived)?;

        if credential.provider != provider {
            debug!(requested = %provider, issued = %credential.provider, "Backend issued credential for a different provider");
        }

        self.store.store(&credential).await?;
        info!(provider = %credential.provider, new_user = params.new_user, "Logged in with third-party provider");

        Ok(LoginOutcome { provider: credential.provider, user_id: params.user_id, new_user: params.new_user })
    }

    /// Forget the stored credential.
    ///
    /// # Errors
    /// Returns `OAuth2ServiceError::Store` if the pair cannot be removed
    pub async fn logout(&self) -> Result<(), OAuth2ServiceError> {
        self.store.clear().await?;
        info!("Logged out of third-party provider");
        Ok(())
    }

    /// # Errors
    /// Returns `OAuth2ServiceError::Store` if the store cannot be read
    pub async fn current_credential(&self) -> Result<Option<ThirdPartyCredential>, OAuth2ServiceError> {
        Ok(self.store.get().await?)
    }

    /// # Errors
    /// Returns `OAuth2ServiceError::Store` if the store cannot be read
    pub async fn current_provider(&self) -> Result<Option<Provider>, OAuth2ServiceError> {
        Ok(self.store.provider().await?)
    }

    /// # Errors
    /// Returns `OAuth2ServiceError::Store` if the store cannot be read
    pub async fn is_authenticated(&self) -> Result<bool, OAuth2ServiceError> {
        Ok(self.current_credential().await?.is_some())
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }
}
