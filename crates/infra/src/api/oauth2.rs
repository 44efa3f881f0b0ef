//! Account-linking endpoints
//!
//! Linking, unlinking and listing are only meaningful for a session that
//! signed in through a provider, so each call checks for a stored
//! third-party credential before touching the network.

use std::sync::Arc;

use gametout_domain::constants::{
    OAUTH2_LINKED_ACCOUNTS_PATH, OAUTH2_LINK_PATH, OAUTH2_UNLINK_PATH,
};
use gametout_domain::{LinkedAccount, Provider};
use serde::Deserialize;
use tracing::{info, instrument};
use url::Url;

use super::auth::CredentialResolver;
use super::client::ApiClient;
use super::errors::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkResponse {
    authorization_url: String,
}

/// Client for `/oauth2/link`, `/oauth2/unlink` and `/oauth2/linked-accounts`.
pub struct OAuth2Api {
    client: Arc<ApiClient>,
    resolver: Arc<CredentialResolver>,
}

impl OAuth2Api {
    pub fn new(client: Arc<ApiClient>, resolver: Arc<CredentialResolver>) -> Self {
        Self { client, resolver }
    }

    /// Provider authorization URL for linking another identity to the
    /// current account.
    ///
    /// # Errors
    /// `ApiError::Auth` without a stored third-party credential; otherwise
    /// whatever the request yields. An unparseable URL is `ApiError::Client`.
    #[instrument(skip(self), fields(provider = %provider))]
    pub async fn link_url(&self, provider: Provider) -> Result<Url, ApiError> {
        self.require_credential().await?;

        let response: LinkResponse =
            self.client.get(&format!("{}/{}", OAUTH2_LINK_PATH, provider)).await?;
        let url = Url::parse(&response.authorization_url).map_err(|e| {
            ApiError::Client(format!("Invalid authorization URL from server: {}", e))
        })?;

        info!(provider = %provider, "Obtained account-link URL");
        Ok(url)
    }

    /// Detach `provider` from the current account.
    ///
    /// # Errors
    /// `ApiError::Auth` without a stored third-party credential; otherwise
    /// whatever the request yields.
    #[instrument(skip(self), fields(provider = %provider))]
    pub async fn unlink(&self, provider: Provider) -> Result<(), ApiError> {
        self.require_credential().await?;

        let _: Option<serde_json::Value> =
            self.client.delete(&format!("{}/{}", OAUTH2_UNLINK_PATH, provider)).await?;

        info!(provider = %provider, "Unlinked provider");
        Ok(())
    }

    /// Provider identities linked to the current account.
    ///
    /// # Errors
    /// `ApiError::Auth` without a stored third-party credential; otherwise
    /// whatever the request yields.
    #[instrument(skip(self))]
    pub async fn linked_accounts(&self) -> Result<Vec<LinkedAccount>, ApiError> {
        self.require_credential().await?;
        self.client.get(OAUTH2_LINKED_ACCOUNTS_PATH).await
    }

    async fn require_credential(&self) -> Result<(), ApiError> {
        if self.resolver.has_third_party_credential().await? {
            Ok(())
        } else {
            Err(ApiError::Auth("not signed in with a third-party provider".into()))
        }
    }
}
