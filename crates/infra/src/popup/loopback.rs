//! Loopback HTTP server standing in for the application window
//!
//! Each handshake gets a fresh random nonce. The backend redirects the
//! provider popup to `{origin}{callback_path}/{nonce}`; this server records
//! that visit (so the popup's location becomes readable and same-origin) and
//! serves a page that posts the `OAUTH2_CALLBACK` message back to
//! `/oauth2/message/{nonce}`, from where it is forwarded onto the handshake's
//! [`MessageBus`]. Requests carrying any other nonce are refused.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use gametout_common::auth::{MessageBus, WindowMessage};
use gametout_domain::GameToutError;
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

/// Path prefix the callback page posts its message to.
pub const MESSAGE_PATH: &str = "/oauth2/message";

const NONCE_LEN: usize = 32;

const CALLBACK_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>GameTout Sign-in</title></head>
<body>
<h1>Completing sign-in&hellip;</h1>
<p>You can close this window.</p>
<script>
  const nonce = window.location.pathname.split("/").pop();
  const params = new URLSearchParams(window.location.search);
  const message = { type: "OAUTH2_CALLBACK" };
  for (const key of ["token", "provider", "userId", "newUser", "error"]) {
    const value = params.get(key);
    if (value !== null) message[key] = value;
  }
  fetch("/oauth2/message/" + encodeURIComponent(nonce), {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify(message),
  }).finally(() => window.close());
</script>
</body>
</html>"#;

const REJECTED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>GameTout Sign-in</title></head>
<body><h1>Sign-in Failed</h1><p>This callback does not belong to an active sign-in.</p></body>
</html>"#;

struct LoopbackState {
    origin: Url,
    expected_nonce: Mutex<Option<String>>,
    visited: Mutex<Option<Url>>,
    messages: MessageBus,
}

impl LoopbackState {
    fn accepts(&self, nonce: &str) -> bool {
        self.expected_nonce.lock().as_deref() == Some(nonce)
    }
}

/// Loopback HTTP server that receives the handshake callback.
pub struct LoopbackCallbackServer {
    state: Arc<LoopbackState>,
    callback_path: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl LoopbackCallbackServer {
    /// Start the server on an ephemeral `127.0.0.1` port.
    ///
    /// Messages posted by the callback page are delivered to `messages`.
    ///
    /// # Errors
    /// Returns `GameToutError::Network` if the listener cannot be bound and
    /// `GameToutError::Config` for a callback path that is not a plain
    /// absolute path or collides with the message endpoint.
    pub async fn start(callback_path: &str, messages: MessageBus) -> Result<Self, GameToutError> {
        let callback_path = validate_callback_path(callback_path)?;

        let listener = TcpListener::bind("127.0.0.1:0").await.map_err(|err| {
            GameToutError::Network(format!("failed to bind loopback callback server: {err}"))
        })?;

        let port = listener
            .local_addr()
            .map_err(|err| GameToutError::Network(format!("failed to determine port: {err}")))?
            .port();

        let origin = Url::parse(&format!("http://127.0.0.1:{port}"))
            .map_err(|err| GameToutError::Internal(format!("loopback origin: {err}")))?;

        let state = Arc::new(LoopbackState {
            origin,
            expected_nonce: Mutex::new(None),
            visited: Mutex::new(None),
            messages,
        });

        let app = Router::new()
            .route(&callback_path, get(handle_stray_callback))
            .route(&format!("{callback_path}/{{nonce}}"), get(handle_callback))
            .route(&format!("{MESSAGE_PATH}/{{nonce}}"), post(handle_message))
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!("Loopback callback server error: {}", err);
            }
        });

        info!(port, callback_path = %callback_path, "Loopback callback server listening");

        Ok(Self { state, callback_path, shutdown_tx: Some(shutdown_tx), handle: Some(handle) })
    }

    /// Origin of the server, e.g. `http://127.0.0.1:53117/`.
    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.state.origin
    }

    #[must_use]
    pub fn message_bus(&self) -> &MessageBus {
        &self.state.messages
    }

    /// Arm the server for a new popup.
    ///
    /// Rotates the nonce, forgets any earlier callback visit and returns the
    /// absolute URL the backend should redirect the popup to. Callbacks and
    /// messages for earlier nonces are refused from here on.
    pub fn begin_handshake(&self) -> Url {
        let nonce: String =
            rand::thread_rng().sample_iter(&Alphanumeric).take(NONCE_LEN).map(char::from).collect();

        let mut url = self.state.origin.clone();
        url.set_path(&format!("{}/{nonce}", self.callback_path));

        *self.state.expected_nonce.lock() = Some(nonce);
        self.state.visited.lock().take();
        url
    }

    /// Last callback URL the popup landed on since the current handshake
    /// began, if any.
    #[must_use]
    pub fn visited_callback(&self) -> Option<Url> {
        self.state.visited.lock().clone()
    }

    /// Shut down the server gracefully.
    ///
    /// # Errors
    /// Returns `GameToutError::Internal` if the server task panicked
    pub async fn shutdown(mut self) -> Result<(), GameToutError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    return Err(GameToutError::Internal(format!(
                        "loopback callback server panicked: {err}"
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Drop for LoopbackCallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

/// Normalize the configured callback path into something the router can
/// mount literally: absolute, no trailing slash, no capture or wildcard
/// syntax, and clear of the message endpoint.
fn validate_callback_path(path: &str) -> Result<String, GameToutError> {
    let trimmed = path.trim_end_matches('/');
    let invalid = !path.starts_with('/')
        || trimmed.is_empty()
        || trimmed.contains(['{', '}', '*'])
        || trimmed.split('/').any(|segment| segment.starts_with(':'))
        || trimmed == MESSAGE_PATH
        || trimmed.starts_with(&format!("{MESSAGE_PATH}/"));

    if invalid {
        return Err(GameToutError::Config(format!("invalid loopback callback path: {path}")));
    }
    Ok(trimmed.to_string())
}

async fn handle_callback(
    State(state): State<Arc<LoopbackState>>,
    Path(nonce): Path<String>,
    uri: Uri,
) -> (StatusCode, Html<&'static str>) {
    if !state.accepts(&nonce) {
        warn!("Callback request with unknown nonce ignored");
        return (StatusCode::FORBIDDEN, Html(REJECTED_PAGE));
    }

    let path_and_query = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());
    match state.origin.join(path_and_query) {
        Ok(url) => {
            debug!(path = url.path(), "Popup reached callback path");
            *state.visited.lock() = Some(url);
        }
        Err(err) => warn!(error = %err, "Unparseable callback request URI"),
    }
    (StatusCode::OK, Html(CALLBACK_PAGE))
}

async fn handle_stray_callback() -> (StatusCode, Html<&'static str>) {
    warn!("Callback request without nonce ignored");
    (StatusCode::FORBIDDEN, Html(REJECTED_PAGE))
}

async fn handle_message(
    State(state): State<Arc<LoopbackState>>,
    Path(nonce): Path<String>,
    headers: HeaderMap,
    Json(data): Json<serde_json::Value>,
) -> StatusCode {
    if !state.accepts(&nonce) {
        warn!("Callback message with unknown nonce dropped");
        return StatusCode::FORBIDDEN;
    }

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("null");

    let delivered = state.messages.post(WindowMessage::new(origin, data));
    debug!(origin, delivered, "Forwarded callback message");
    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn message_url(callback: &Url) -> Url {
        let nonce = callback.path_segments().and_then(Iterator::last).unwrap();
        callback.join(&format!("{MESSAGE_PATH}/{nonce}")).unwrap()
    }

    #[tokio::test]
    async fn records_callback_visit_with_query() {
        let server = LoopbackCallbackServer::start("/oauth2/callback", MessageBus::new())
            .await
            .unwrap();
        assert!(server.visited_callback().is_none());

        let callback = server.begin_handshake();
        assert!(callback.path().starts_with("/oauth2/callback/"));

        let url = format!("{callback}?token=abc&provider=steam");
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response.text().await.unwrap().contains("OAUTH2_CALLBACK"));

        let visited = server.visited_callback().unwrap();
        assert_eq!(visited.path(), callback.path());
        assert_eq!(visited.query(), Some("token=abc&provider=steam"));
        assert_eq!(visited.origin(), server.origin().origin());

        server.begin_handshake();
        assert!(server.visited_callback().is_none());
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn callback_with_wrong_or_missing_nonce_is_not_recorded() {
        let server = LoopbackCallbackServer::start("/oauth2/callback", MessageBus::new())
            .await
            .unwrap();
        let callback = server.begin_handshake();

        let forged = server.origin().join("/oauth2/callback/forged?token=x&provider=discord").unwrap();
        let response = reqwest::get(forged).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

        let bare = server.origin().join("/oauth2/callback?token=x&provider=discord").unwrap();
        let response = reqwest::get(bare).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

        assert!(server.visited_callback().is_none());

        // A rotated nonce invalidates the previous callback URL.
        server.begin_handshake();
        let response = reqwest::get(format!("{callback}?token=x")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
        assert!(server.visited_callback().is_none());
    }

    #[tokio::test]
    async fn forwards_posted_message_with_origin_header() {
        let bus = MessageBus::new();
        let mut subscription = bus.subscribe();
        let server = LoopbackCallbackServer::start("/oauth2/callback", bus).await.unwrap();
        let callback = server.begin_handshake();

        let origin = server.origin().origin().ascii_serialization();
        let response = reqwest::Client::new()
            .post(message_url(&callback))
            .header("Origin", &origin)
            .json(&json!({ "type": "OAUTH2_CALLBACK", "token": "t" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);

        let message = subscription.recv().await.unwrap();
        assert_eq!(message.origin, origin);
        assert_eq!(message.data["token"], "t");
    }

    #[tokio::test]
    async fn message_with_wrong_nonce_is_dropped() {
        let bus = MessageBus::new();
        let mut subscription = bus.subscribe();
        let server = LoopbackCallbackServer::start("/oauth2/callback", bus).await.unwrap();
        let callback = server.begin_handshake();
        let client = reqwest::Client::new();

        let forged = client
            .post(server.origin().join(&format!("{MESSAGE_PATH}/forged")).unwrap())
            .json(&json!({ "type": "OAUTH2_CALLBACK", "token": "ATTACKER" }))
            .send()
            .await
            .unwrap();
        assert_eq!(forged.status(), reqwest::StatusCode::FORBIDDEN);

        client
            .post(message_url(&callback))
            .json(&json!({ "type": "OAUTH2_CALLBACK", "token": "genuine" }))
            .send()
            .await
            .unwrap();

        assert_eq!(subscription.recv().await.unwrap().data["token"], "genuine");
    }

    #[tokio::test]
    async fn message_without_origin_is_tagged_null() {
        let bus = MessageBus::new();
        let mut subscription = bus.subscribe();
        let server = LoopbackCallbackServer::start("/cb", bus).await.unwrap();
        let callback = server.begin_handshake();

        reqwest::Client::new()
            .post(message_url(&callback))
            .json(&json!({ "type": "OAUTH2_CALLBACK" }))
            .send()
            .await
            .unwrap();

        assert_eq!(subscription.recv().await.unwrap().origin, "null");
    }

    #[tokio::test]
    async fn rejects_unmountable_callback_paths() {
        for path in ["callback", "/", MESSAGE_PATH, "/oauth2/message/x", "/cb/{id}", "/cb/:id", "/cb/*rest"] {
            let result = LoopbackCallbackServer::start(path, MessageBus::new()).await;
            assert!(matches!(result, Err(GameToutError::Config(_))), "{path} should be rejected");
        }
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(validate_callback_path("/oauth2/callback/").unwrap(), "/oauth2/callback");
    }
}
