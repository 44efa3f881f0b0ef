//! Application context - dependency injection container

use std::fmt;
use std::io;
use std::sync::Arc;

use gametout_common::auth::{
    CredentialStore, HandshakeConfig, HandshakeCoordinator, KeychainCredentialStore, MessageBus,
    OAuth2LoginService,
};
use gametout_domain::{Config, GameToutError, Result};
use gametout_infra::api::{
    ApiClient, ApiClientConfig, CredentialResolver, EnvSessionToken, OAuth2Api,
    SessionTokenSource,
};
use gametout_infra::config;
use gametout_infra::popup::{LoopbackCallbackServer, SystemBrowserOpener};
use tracing::info;
use url::Url;

/// Opens a URL for the user; the default hands it to the system browser.
pub type BrowserLauncher = dyn Fn(&Url) -> io::Result<()> + Send + Sync;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub credentials: Arc<dyn CredentialStore>,
    pub resolver: Arc<CredentialResolver>,
    pub session: Arc<dyn SessionTokenSource>,
    pub api: Arc<ApiClient>,
    pub oauth2: Arc<OAuth2Api>,
    launcher: Arc<BrowserLauncher>,
}

impl AppContext {
    /// Build the context from the loaded configuration, the platform
    /// keychain and the environment-provided first-party session.
    ///
    /// # Errors
    /// Returns an error if configuration loading or client construction fails
    pub fn new() -> Result<Self> {
        let config = config::load()?;
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(KeychainCredentialStore::for_service(config.storage.keychain_service.clone()));
        Self::with_parts(config, credentials, Arc::new(EnvSessionToken::new()))
    }

    /// Build the context from explicit parts.
    ///
    /// # Errors
    /// Returns an error if the API client cannot be constructed
    pub fn with_parts(
        config: Config,
        credentials: Arc<dyn CredentialStore>,
        session: Arc<dyn SessionTokenSource>,
    ) -> Result<Self> {
        let resolver = Arc::new(CredentialResolver::new(credentials.clone(), session.clone()));
        let api = Arc::new(
            ApiClient::builder()
                .config(ApiClientConfig::from(&config.api))
                .auth(resolver.clone())
                .build()?,
        );
        let oauth2 = Arc::new(OAuth2Api::new(api.clone(), resolver.clone()));

        info!(api_base = %config.api.base_url, "Application context ready");

        Ok(Self {
            config,
            credentials,
            resolver,
            session,
            api,
            oauth2,
            launcher: Arc::new(|url: &Url| open::that(url.as_str())),
        })
    }

    /// Replace how login and link pages are opened.
    #[must_use]
    pub fn with_browser_launcher<F>(mut self, launcher: F) -> Self
    where
        F: Fn(&Url) -> io::Result<()> + Send + Sync + 'static,
    {
        self.launcher = Arc::new(launcher);
        self
    }

    /// Open `url` with the configured launcher.
    ///
    /// # Errors
    /// Returns `GameToutError::Platform` if the launcher fails
    pub fn open_in_browser(&self, url: &Url) -> Result<()> {
        (self.launcher)(url)
            .map_err(|err| GameToutError::Platform(format!("failed to open browser: {err}")))
    }

    /// Start a loopback callback server and wire a login service around it.
    ///
    /// The server lives as long as the returned service.
    ///
    /// # Errors
    /// Returns an error if the server cannot bind or the handshake settings
    /// are invalid
    pub async fn login_service(&self) -> Result<OAuth2LoginService> {
        let messages = MessageBus::new();
        let server = Arc::new(
            LoopbackCallbackServer::start(&self.config.oauth.callback_path, messages.clone())
                .await?,
        );

        let handshake =
            HandshakeConfig::from_settings(&self.config.api, &self.config.oauth, server.origin())
                .map_err(|err| GameToutError::Config(err.to_string()))?;

        let launcher = self.launcher.clone();
        let opener =
            Arc::new(SystemBrowserOpener::with_launcher(server, move |url: &Url| launcher(url)));
        let coordinator = HandshakeCoordinator::new(handshake, opener, messages)
            .map_err(|err| GameToutError::Config(err.to_string()))?;

        Ok(OAuth2LoginService::new(Arc::new(coordinator), self.credentials.clone()))
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext").field("config", &self.config).finish_non_exhaustive()
    }
}
