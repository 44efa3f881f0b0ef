//! End-to-end handshake over the loopback callback server
//!
//! The "browser" here is a launcher closure that plays the backend: it
//! follows the `redirect_uri` to the loopback callback page and posts the
//! callback message the page's script would send.

use std::sync::Arc;
use std::time::Duration;

use gametout_common::auth::{
    CredentialStore, HandshakeConfig, HandshakeCoordinator, HandshakeError, MemoryCredentialStore,
    MessageBus, OAuth2LoginService,
};
use gametout_domain::{ApiConfig, OAuthConfig, Provider};
use gametout_infra::popup::{
    LoopbackCallbackServer, SystemBrowserOpener, MESSAGE_PATH, REDIRECT_URI_PARAM,
};
use serde_json::{json, Value};
use url::Url;

fn redirect_target(login_url: &Url) -> Url {
    let redirect = login_url
        .query_pairs()
        .find(|(key, _)| key == REDIRECT_URI_PARAM)
        .map(|(_, value)| value.into_owned())
        .expect("login URL should carry a redirect_uri");
    Url::parse(&redirect).expect("redirect_uri should be absolute")
}

/// Simulates the backend redirect plus the callback page's `fetch` POST.
fn complete_in_background(login_url: &Url, query: &'static str, message: Option<Value>) {
    let callback = redirect_target(login_url);
    tokio::spawn(async move {
        let client = reqwest::Client::new();
        let mut visit = callback.clone();
        visit.set_query(Some(query));
        client.get(visit).send().await.expect("callback page should load");

        if let Some(body) = message {
            let origin = callback.origin().ascii_serialization();
            let nonce = callback.path_segments().and_then(Iterator::last).expect("callback nonce");
            client
                .post(callback.join(&format!("{MESSAGE_PATH}/{nonce}")).expect("message URL"))
                .header("Origin", origin)
                .json(&body)
                .send()
                .await
                .expect("message post should succeed");
        }
    });
}

async fn coordinator<F>(timeout: Duration, launcher: F) -> HandshakeCoordinator
where
    F: Fn(&Url) -> std::io::Result<()> + Send + Sync + 'static,
{
    coordinator_with_server(timeout, launcher).await.0
}

async fn coordinator_with_server<F>(
    timeout: Duration,
    launcher: F,
) -> (HandshakeCoordinator, Arc<LoopbackCallbackServer>)
where
    F: Fn(&Url) -> std::io::Result<()> + Send + Sync + 'static,
{
    let bus = MessageBus::new();
    let oauth = OAuthConfig { poll_interval_ms: 20, ..OAuthConfig::default() };
    let server = Arc::new(
        LoopbackCallbackServer::start(&oauth.callback_path, bus.clone())
            .await
            .expect("loopback server should start"),
    );
    let api = ApiConfig { base_url: "https://api.gametout.test".into(), ..ApiConfig::default() };
    let config = HandshakeConfig::from_settings(&api, &oauth, server.origin())
        .expect("config should be valid")
        .with_timeout(timeout);
    let opener = Arc::new(SystemBrowserOpener::with_launcher(server.clone(), launcher));

    (HandshakeCoordinator::new(config, opener, bus).expect("coordinator should build"), server)
}

#[tokio::test]
async fn callback_message_completes_login_and_persists_pair() {
    let coordinator = coordinator(Duration::from_secs(10), |url: &Url| {
        assert_eq!(url.path(), "/oauth2/login/discord");
        complete_in_background(
            url,
            "token=jwt-1&provider=discord&userId=42&newUser=true",
            Some(json!({
                "type": "OAUTH2_CALLBACK",
                "token": "jwt-1",
                "provider": "discord",
                "userId": "42",
                "newUser": "true"
            })),
        );
        Ok(())
    })
    .await;

    let store = Arc::new(MemoryCredentialStore::in_memory());
    let service = OAuth2LoginService::new(Arc::new(coordinator), store.clone());

    let outcome = service.login(Provider::Discord).await.expect("login should succeed");
    assert_eq!(outcome.provider, Provider::Discord);
    assert!(outcome.new_user);

    let stored = store.get().await.unwrap().expect("credential should be stored");
    assert_eq!(stored.token, "jwt-1");
    assert_eq!(stored.provider, Provider::Discord);
}

#[tokio::test]
async fn callback_visit_alone_resolves_through_polling() {
    let coordinator = coordinator(Duration::from_secs(10), |url: &Url| {
        complete_in_background(url, "token=jwt-2&provider=steam", None);
        Ok(())
    })
    .await;

    let params = coordinator.initiate(Provider::Steam).await.expect("polling should resolve");
    assert_eq!(params.token.as_deref(), Some("jwt-2"));
    assert_eq!(params.provider, Some(Provider::Steam));
}

#[tokio::test]
async fn provider_error_on_callback_is_surfaced() {
    let coordinator = coordinator(Duration::from_secs(10), |url: &Url| {
        complete_in_background(url, "error=access_denied", None);
        Ok(())
    })
    .await;

    let err = coordinator.initiate(Provider::LinkedIn).await.unwrap_err();
    assert_eq!(err, HandshakeError::Provider("access_denied".into()));
}

#[tokio::test]
async fn unreachable_browser_is_reported_as_blocked() {
    let coordinator = coordinator(Duration::from_secs(10), |_: &Url| {
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no browser"))
    })
    .await;

    assert_eq!(coordinator.initiate(Provider::Discord).await, Err(HandshakeError::PopupBlocked));
}

#[tokio::test]
async fn abandoned_browser_tab_times_out() {
    let coordinator = coordinator(Duration::from_millis(200), |_: &Url| Ok(())).await;

    let err = coordinator.initiate(Provider::Discord).await.unwrap_err();
    assert!(matches!(err, HandshakeError::Timeout(_)));
}

#[tokio::test]
async fn forged_callbacks_without_the_popup_nonce_leave_handshake_pending() {
    let (coordinator, server) =
        coordinator_with_server(Duration::from_millis(500), |_: &Url| Ok(())).await;
    let origin = server.origin().clone();

    tokio::spawn(async move {
        let client = reqwest::Client::new();
        let evil = "https://evil.example.com";
        for path in [
            "/oauth2/callback?token=FORGED&provider=discord",
            "/oauth2/callback/guessed?token=FORGED&provider=discord",
        ] {
            let response = client
                .get(origin.join(path).expect("forged URL"))
                .header("Origin", evil)
                .send()
                .await
                .expect("loopback server should answer");
            assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
        }

        let response = client
            .post(origin.join(&format!("{MESSAGE_PATH}/guessed")).expect("message URL"))
            .header("Origin", origin.origin().ascii_serialization())
            .json(&json!({ "type": "OAUTH2_CALLBACK", "token": "FORGED", "provider": "discord" }))
            .send()
            .await
            .expect("loopback server should answer");
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    });

    let err = coordinator.initiate(Provider::Discord).await.unwrap_err();
    assert!(matches!(err, HandshakeError::Timeout(_)), "unexpected outcome: {err:?}");
}
