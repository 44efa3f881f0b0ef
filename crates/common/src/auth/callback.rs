//! Callback payload parsing
//!
//! The backend finishes the provider exchange by redirecting the popup to
//! the application's callback path with the outcome in the query string,
//! and the callback page relays the same fields as an `OAUTH2_CALLBACK`
//! message. Both shapes normalize to [`CallbackParams`].

use gametout_domain::constants::CALLBACK_MESSAGE_TYPE;
use gametout_domain::{Provider, ThirdPartyCredential};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::handshake::HandshakeError;

/// Fields delivered by the backend at the end of a handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackParams {
    pub token: Option<String>,
    pub provider: Option<Provider>,
    pub user_id: Option<String>,
    /// Whether the backend created a new GameTout account for this identity.
    #[serde(default)]
    pub new_user: bool,
    pub error: Option<String>,
}

impl CallbackParams {
    /// Extract the callback fields from a callback URL's query string.
    #[must_use]
    pub fn from_query(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "token" => params.token = non_empty(&value),
                "provider" => params.provider = parse_provider(&value),
                "userId" => params.user_id = non_empty(&value),
                "newUser" => params.new_user = value.eq_ignore_ascii_case("true"),
                "error" => params.error = non_empty(&value),
                _ => {}
            }
        }
        params
    }

    /// Interpret a posted message.
    ///
    /// Returns `None` for anything that is not an `OAUTH2_CALLBACK` message;
    /// such messages are ignored by the handshake. Once the type matches,
    /// fields of the wrong JSON type read as absent, so a malformed callback
    /// still settles the handshake.
    #[must_use]
    pub fn from_message(data: &Value) -> Option<Self> {
        match data.get("type").and_then(Value::as_str) {
            Some(CALLBACK_MESSAGE_TYPE) => {}
            kind => {
                debug!(kind, "Ignoring non-callback message");
                return None;
            }
        }

        let text = |key: &str| data.get(key).and_then(Value::as_str).and_then(non_empty);

        let user_id = data.get("userId").and_then(|value| match value {
            Value::String(text) => non_empty(text),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        });

        let new_user = match data.get("newUser") {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => text.eq_ignore_ascii_case("true"),
            _ => false,
        };

        Some(Self {
            token: text("token"),
            provider: text("provider").as_deref().and_then(parse_provider),
            user_id,
            new_user,
            error: text("error"),
        })
    }

    /// Decide the handshake result carried by these fields.
    ///
    /// A provider error is surfaced verbatim. Success requires both a token
    /// and a recognized provider; anything else means no token arrived.
    ///
    /// # Errors
    /// Returns `HandshakeError::Provider` or `HandshakeError::NoTokenReceived`
    pub fn into_outcome(self) -> Result<Self, HandshakeError> {
        if let Some(error) = self.error {
            return Err(HandshakeError::Provider(error));
        }
        if self.token.is_some() && self.provider.is_some() {
            Ok(self)
        } else {
            Err(HandshakeError::NoTokenReceived)
        }
    }

    /// The bearer credential, when both halves are present.
    #[must_use]
    pub fn credential(&self) -> Option<ThirdPartyCredential> {
        match (&self.token, self.provider) {
            (Some(token), Some(provider)) => Some(ThirdPartyCredential::new(token.clone(), provider)),
            _ => None,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_provider(value: &str) -> Option<Provider> {
    match value.parse() {
        Ok(provider) => Some(provider),
        Err(err) => {
            debug!(error = %err, "Callback named an unsupported provider");
            None
        }
    }
}
