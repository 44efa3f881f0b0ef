//! Popup handshake coordinator
//!
//! Opens the backend's provider login page in a centered popup and waits for
//! the backend to report the outcome. Two detection paths race:
//!
//! - **Message path** (primary): the callback page posts an
//!   `OAUTH2_CALLBACK` message from the application's own origin.
//! - **URL poll** (fallback): every poll interval the popup's location is
//!   probed; reads fail while the provider's pages are shown and succeed once
//!   the popup lands back on the application's callback path.
//!
//! A timeout bounds the whole exchange. Whichever path settles first wins;
//! the resolved flag on [`HandshakeRequest`] guarantees the caller sees
//! exactly one outcome, after which the poll timer, the deadline and the
//! message subscription are all dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gametout_domain::constants::{
    DEFAULT_CALLBACK_PATH, DEFAULT_HANDSHAKE_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_POPUP_HEIGHT, DEFAULT_POPUP_WIDTH, OAUTH2_LOGIN_PATH,
};
use gametout_domain::{ApiConfig, OAuthConfig, Provider};
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};
use url::{Origin, Url};

use super::callback::CallbackParams;
use super::popup::{
    LocationProbe, MessageBus, MessageSubscription, PopupFeatures, PopupOpener, PopupWindow,
    ScreenGeometry, WindowMessage,
};

/// Failure modes of a popup handshake
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// The environment refused to open the popup
    #[error("Popup blocked. Please allow popups for this site.")]
    PopupBlocked,

    /// The user closed the popup before a result arrived
    #[error("Authentication cancelled")]
    Cancelled,

    /// The backend reported neither a usable token nor an error
    #[error("No token received")]
    NoTokenReceived,

    /// The backend relayed a provider error; the message is kept verbatim
    #[error("{0}")]
    Provider(String),

    /// No result within the configured window
    #[error("Authentication timed out after {}s. Please try again.", .0.as_secs())]
    Timeout(Duration),

    /// The coordinator was configured with unusable settings
    #[error("Invalid handshake configuration: {0}")]
    InvalidConfig(String),
}

impl HandshakeError {
    /// Whether the user deliberately abandoned the flow. Callers usually
    /// stay quiet in that case instead of showing an error.
    #[must_use]
    pub const fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Outcome delivered to the caller of [`HandshakeCoordinator::initiate`].
pub type HandshakeOutcome = Result<CallbackParams, HandshakeError>;

/// Settings for one coordinator.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Backend base URL; the login page lives at `{api_base}/oauth2/login/{provider}`.
    pub api_base: Url,
    /// The origin callback messages and callback locations must come from.
    pub app_origin: Origin,
    pub callback_path: String,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub popup_width: u32,
    pub popup_height: u32,
    pub screen: ScreenGeometry,
}

impl HandshakeConfig {
    /// Config with default timings for the given backend and app origin.
    ///
    /// # Errors
    /// Returns `HandshakeError::InvalidConfig` if either URL does not parse
    pub fn new(api_base: &str, app_origin: &str) -> Result<Self, HandshakeError> {
        let api_base = parse_url("api base", api_base)?;
        let app_origin = parse_url("app origin", app_origin)?.origin();

        Ok(Self {
            api_base,
            app_origin,
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
            popup_width: DEFAULT_POPUP_WIDTH,
            popup_height: DEFAULT_POPUP_HEIGHT,
            screen: ScreenGeometry::default(),
        })
    }

    /// Build from the loaded application configuration.
    ///
    /// # Errors
    /// Returns `HandshakeError::InvalidConfig` if the API base does not parse
    pub fn from_settings(
        api: &ApiConfig,
        oauth: &OAuthConfig,
        app_origin: &Url,
    ) -> Result<Self, HandshakeError> {
        Ok(Self {
            api_base: parse_url("api base", &api.base_url)?,
            app_origin: app_origin.origin(),
            callback_path: oauth.callback_path.clone(),
            poll_interval: oauth.poll_interval(),
            timeout: oauth.timeout(),
            popup_width: oauth.popup_width,
            popup_height: oauth.popup_height,
            screen: ScreenGeometry::default(),
        })
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_callback_path(mut self, callback_path: impl Into<String>) -> Self {
        self.callback_path = callback_path.into();
        self
    }

    #[must_use]
    pub fn with_screen(mut self, screen: ScreenGeometry) -> Self {
        self.screen = screen;
        self
    }

    /// The backend page that starts the provider exchange.
    ///
    /// # Errors
    /// Returns `HandshakeError::InvalidConfig` if the joined URL is invalid
    pub fn login_url(&self, provider: Provider) -> Result<Url, HandshakeError> {
        let base = self.api_base.as_str().trim_end_matches('/');
        parse_url("login url", &format!("{base}{OAUTH2_LOGIN_PATH}/{provider}"))
    }

    #[must_use]
    pub fn popup_features(&self) -> PopupFeatures {
        PopupFeatures::centered(&self.screen, self.popup_width, self.popup_height)
    }

    fn validate(&self) -> Result<(), HandshakeError> {
        if self.poll_interval.is_zero() {
            return Err(HandshakeError::InvalidConfig("poll interval must be non-zero".into()));
        }
        if self.timeout.is_zero() {
            return Err(HandshakeError::InvalidConfig("timeout must be non-zero".into()));
        }
        if !self.app_origin.is_tuple() {
            return Err(HandshakeError::InvalidConfig("app origin must be http(s)".into()));
        }
        if self.callback_path.is_empty() {
            return Err(HandshakeError::InvalidConfig("callback path must be set".into()));
        }
        Ok(())
    }
}

fn parse_url(what: &str, value: &str) -> Result<Url, HandshakeError> {
    Url::parse(value).map_err(|e| HandshakeError::InvalidConfig(format!("{what} '{value}': {e}")))
}

/// State of one in-flight handshake.
///
/// Each `on_*` handler returns `Some(outcome)` only for the single event that
/// settles the request; every later event is a no-op.
pub struct HandshakeRequest {
    provider: Provider,
    popup: Box<dyn PopupWindow>,
    resolved: AtomicBool,
    app_origin: Origin,
    callback_path: String,
    timeout: Duration,
    deadline: Instant,
}

impl HandshakeRequest {
    #[must_use]
    pub fn new(provider: Provider, popup: Box<dyn PopupWindow>, config: &HandshakeConfig) -> Self {
        Self {
            provider,
            popup,
            resolved: AtomicBool::new(false),
            app_origin: config.app_origin.clone(),
            callback_path: config.callback_path.clone(),
            timeout: config.timeout,
            deadline: Instant::now() + config.timeout,
        }
    }

    #[must_use]
    pub const fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    /// Handle a message posted to the application window.
    ///
    /// Messages from foreign origins and messages that are not callback
    /// messages are ignored and leave the request pending.
    pub fn on_message(&self, message: &WindowMessage) -> Option<HandshakeOutcome> {
        if self.is_resolved() {
            return None;
        }
        if message.origin != self.app_origin.ascii_serialization() {
            debug!(origin = %message.origin, "Ignoring message from foreign origin");
            return None;
        }
        let params = CallbackParams::from_message(&message.data)?;
        if !self.settle() {
            return None;
        }

        debug!(provider = %self.provider, "Callback message received");
        self.close_popup();
        Some(params.into_outcome())
    }

    /// Handle one poll tick: detect a closed popup or a callback location.
    pub fn on_poll_tick(&self) -> Option<HandshakeOutcome> {
        if self.is_resolved() {
            return None;
        }
        if self.popup.is_closed() {
            return self.settle().then_some(Err(HandshakeError::Cancelled));
        }

        match LocationProbe::probe(self.popup.as_ref(), &self.app_origin, &self.callback_path) {
            LocationProbe::CrossOrigin => {
                trace!(provider = %self.provider, "Popup still on provider pages");
                None
            }
            LocationProbe::SameOrigin(url) => {
                trace!(path = %url.path(), "Popup on app origin, not yet at callback");
                None
            }
            LocationProbe::Callback(url) => {
                if !self.settle() {
                    return None;
                }
                debug!(provider = %self.provider, "Callback location detected by polling");
                self.close_popup();
                Some(CallbackParams::from_query(&url).into_outcome())
            }
        }
    }

    /// Handle the deadline firing. Force-closes a popup that is still open.
    pub fn on_timeout(&self) -> Option<HandshakeOutcome> {
        if !self.settle() {
            return None;
        }
        self.close_popup();
        Some(Err(HandshakeError::Timeout(self.timeout)))
    }

    fn settle(&self) -> bool {
        self.resolved.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    fn close_popup(&self) {
        if !self.popup.is_closed() {
            self.popup.close();
        }
    }
}

enum HandshakeEvent {
    Message(Option<WindowMessage>),
    PollTick,
    Deadline,
}

/// Drives popup handshakes against one backend and one application origin.
#[derive(Clone)]
pub struct HandshakeCoordinator {
    config: HandshakeConfig,
    opener: Arc<dyn PopupOpener>,
    messages: MessageBus,
}

impl HandshakeCoordinator {
    /// # Errors
    /// Returns `HandshakeError::InvalidConfig` for zero timings, an opaque
    /// app origin or an empty callback path
    pub fn new(
        config: HandshakeConfig,
        opener: Arc<dyn PopupOpener>,
        messages: MessageBus,
    ) -> Result<Self, HandshakeError> {
        config.validate()?;
        Ok(Self { config, opener, messages })
    }

    #[must_use]
    pub const fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Run one handshake for `provider` and wait for its single outcome.
    ///
    /// Fails immediately with [`HandshakeError::PopupBlocked`] if no popup
    /// could be opened. Persists nothing; storing the credential is the
    /// caller's decision.
    ///
    /// # Errors
    /// Returns the [`HandshakeError`] that settled the handshake
    pub async fn initiate(&self, provider: Provider) -> HandshakeOutcome {
        let login_url = self.config.login_url(provider)?;
        let features = self.config.popup_features();

        let Some(popup) = self.opener.open(&login_url, &features) else {
            warn!(provider = %provider, "Popup blocked");
            return Err(HandshakeError::PopupBlocked);
        };
        info!(provider = %provider, url = %login_url, "OAuth2 popup opened");

        let request = HandshakeRequest::new(provider, popup, &self.config);
        let mut subscription = Some(self.messages.subscribe());

        let period = self.config.poll_interval;
        let mut poll = tokio::time::interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let deadline = tokio::time::sleep_until(request.deadline());
        tokio::pin!(deadline);

        let outcome = loop {
            let event = tokio::select! {
                biased;
                message = next_message(&mut subscription) => HandshakeEvent::Message(message),
                _ = poll.tick() => HandshakeEvent::PollTick,
                () = &mut deadline => HandshakeEvent::Deadline,
            };

            let settled = match event {
                HandshakeEvent::Message(Some(message)) => request.on_message(&message),
                HandshakeEvent::Message(None) => {
                    debug!("Message bus closed; relying on location polling");
                    subscription = None;
                    None
                }
                HandshakeEvent::PollTick => request.on_poll_tick(),
                HandshakeEvent::Deadline => request.on_timeout(),
            };

            if let Some(outcome) = settled {
                break outcome;
            }
        };

        // Tear down the listener before handing the outcome back.
        drop(subscription);
        log_outcome(provider, &outcome);
        outcome
    }
}

async fn next_message(subscription: &mut Option<MessageSubscription>) -> Option<WindowMessage> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

fn log_outcome(provider: Provider, outcome: &HandshakeOutcome) {
    match outcome {
        Ok(params) => info!(provider = %provider, new_user = params.new_user, "OAuth2 handshake succeeded"),
        Err(err) if err.is_user_cancelled() => info!(provider = %provider, "OAuth2 handshake cancelled by user"),
        Err(err) => warn!(provider = %provider, error = %err, "OAuth2 handshake failed"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::FakePopup;

    const APP: &str = "http://127.0.0.1:4711";

    fn config() -> HandshakeConfig {
        HandshakeConfig::new("http://api.test", APP).unwrap()
    }

    fn request(popup: &FakePopup) -> HandshakeRequest {
        HandshakeRequest::new(Provider::Discord, Box::new(popup.clone()), &config())
    }

    fn callback_message(origin: &str) -> WindowMessage {
        WindowMessage::new(
            origin,
            json!({"type": "OAUTH2_CALLBACK", "token": "abc", "provider": "discord", "newUser": false}),
        )
    }

    #[test]
    fn login_url_joins_base_and_provider() {
        let config = HandshakeConfig::new("http://api.test/", APP).unwrap();
        assert_eq!(config.login_url(Provider::Steam).unwrap().as_str(), "http://api.test/oauth2/login/steam");
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let config = config().with_poll_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(HandshakeError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn message_settles_once() {
        let popup = FakePopup::new();
        let request = request(&popup);

        let first = request.on_message(&callback_message(APP));
        let second = request.on_message(&callback_message(APP));

        let params = first.unwrap().unwrap();
        assert_eq!(params.token.as_deref(), Some("abc"));
        assert!(second.is_none());
        assert!(popup.is_closed());
    }

    #[tokio::test]
    async fn foreign_origin_message_is_ignored() {
        let popup = FakePopup::new();
        let request = request(&popup);

        assert!(request.on_message(&callback_message("https://evil.example.com")).is_none());
        assert!(!request.is_resolved());
        assert!(!popup.is_closed());
    }

    #[tokio::test]
    async fn poll_after_message_is_noop() {
        let popup = FakePopup::new();
        let request = request(&popup);
        popup.navigate(&format!("{APP}/oauth2/callback?token=abc&provider=discord"));

        assert!(request.on_message(&callback_message(APP)).is_some());
        assert!(request.on_poll_tick().is_none());
        assert!(request.on_timeout().is_none());
    }

    #[tokio::test]
    async fn closed_popup_cancels() {
        let popup = FakePopup::new();
        let request = request(&popup);
        popup.close_by_user();

        assert_eq!(request.on_poll_tick(), Some(Err(HandshakeError::Cancelled)));
        assert!(request.on_poll_tick().is_none());
    }

    #[tokio::test]
    async fn cross_origin_location_keeps_waiting() {
        let popup = FakePopup::new();
        let request = request(&popup);

        assert!(request.on_poll_tick().is_none());
        assert!(request.on_poll_tick().is_none());
        assert!(!request.is_resolved());
        assert_eq!(popup.probe_count(), 2);
    }

    #[tokio::test]
    async fn timeout_force_closes_popup() {
        let popup = FakePopup::new();
        let request = request(&popup);

        let outcome = request.on_timeout().unwrap();

        assert_eq!(outcome, Err(HandshakeError::Timeout(Duration::from_secs(300))));
        assert!(popup.is_closed());
        assert_eq!(popup.close_count(), 1);
    }
}
