//! Bearer credential resolution for API requests
//!
//! Every request re-reads the stored third-party credential; when one is
//! present it wins outright. Otherwise an active first-party session supplies
//! a fresh token. With neither, the request goes out unauthenticated.

use std::sync::Arc;

use async_trait::async_trait;
use gametout_common::auth::CredentialStore;
use tracing::{debug, warn};

use super::errors::ApiError;

/// Environment variable read by [`EnvSessionToken`].
pub const SESSION_TOKEN_ENV: &str = "GAMETOUT_SESSION_TOKEN";

/// Trait for providing access tokens
///
/// This trait allows dependency injection and testing with mock providers.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Bearer token for the next request, or `None` to send it without one.
    ///
    /// # Errors
    /// Returns `ApiError::Auth` if a token should exist but cannot be produced
    async fn access_token(&self) -> Result<Option<String>, ApiError>;

    /// Invoked after the API answered 401.
    ///
    /// # Errors
    /// Returns `ApiError` if the stale credential cannot be discarded
    async fn on_unauthorized(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

/// First-party identity session (the primary sign-in).
///
/// Its lifecycle is managed elsewhere; the resolver only asks for a fresh
/// token per request.
#[async_trait]
pub trait SessionTokenSource: Send + Sync {
    async fn is_active(&self) -> bool;

    /// Fetch a fresh short-lived token. May refresh under the hood.
    ///
    /// # Errors
    /// Returns `ApiError::Auth` if the session cannot produce a token
    async fn fresh_token(&self) -> Result<String, ApiError>;
}

/// No first-party session; requests without a third-party credential go
/// out unauthenticated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSession;

#[async_trait]
impl SessionTokenSource for NoSession {
    async fn is_active(&self) -> bool {
        false
    }

    async fn fresh_token(&self) -> Result<String, ApiError> {
        Err(ApiError::Auth("no first-party session".into()))
    }
}

/// First-party session token handed in through the environment, e.g. by a
/// launcher that already signed the user in. Re-read on every call.
#[derive(Debug, Clone)]
pub struct EnvSessionToken {
    var: String,
}

impl EnvSessionToken {
    #[must_use]
    pub fn new() -> Self {
        Self::from_var(SESSION_TOKEN_ENV)
    }

    #[must_use]
    pub fn from_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    fn read(&self) -> Option<String> {
        std::env::var(&self.var).ok().filter(|token| !token.trim().is_empty())
    }
}

impl Default for EnvSessionToken {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionTokenSource for EnvSessionToken {
    async fn is_active(&self) -> bool {
        self.read().is_some()
    }

    async fn fresh_token(&self) -> Result<String, ApiError> {
        self.read().ok_or_else(|| ApiError::Auth(format!("{} is not set", self.var)))
    }
}

/// Chooses the bearer credential for each request and invalidates the
/// third-party credential on 401.
pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
    session: Arc<dyn SessionTokenSource>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn CredentialStore>, session: Arc<dyn SessionTokenSource>) -> Self {
        Self { store, session }
    }

    /// Resolver that only ever attaches the third-party credential.
    pub fn third_party_only(store: Arc<dyn CredentialStore>) -> Self {
        Self::new(store, Arc::new(NoSession))
    }

    /// Whether a third-party credential is currently stored.
    ///
    /// # Errors
    /// Returns `ApiError::Auth` if the store cannot be read
    pub async fn has_third_party_credential(&self) -> Result<bool, ApiError> {
        let credential = self
            .store
            .get()
            .await
            .map_err(|e| ApiError::Auth(format!("Failed to read stored credential: {}", e)))?;
        Ok(credential.is_some())
    }
}

#[async_trait]
impl AccessTokenProvider for CredentialResolver {
    async fn access_token(&self) -> Result<Option<String>, ApiError> {
        let stored = self
            .store
            .get()
            .await
            .map_err(|e| ApiError::Auth(format!("Failed to read stored credential: {}", e)))?;

        if let Some(credential) = stored {
            debug!(provider = %credential.provider, "Attaching third-party credential");
            return Ok(Some(credential.token));
        }

        if self.session.is_active().await {
            let token = self.session.fresh_token().await?;
            debug!("Attaching first-party session token");
            return Ok(Some(token));
        }

        debug!("No credential available; sending unauthenticated request");
        Ok(None)
    }

    async fn on_unauthorized(&self) -> Result<(), ApiError> {
        self.store
            .clear()
            .await
            .map_err(|e| ApiError::Auth(format!("Failed to clear stored credential: {}", e)))?;
        warn!("API rejected the request (401); cleared third-party credential");
        Ok(())
    }
}
