//! System browser as the handshake popup
//!
//! The login URL opens in the user's default browser with a `redirect_uri`
//! pointing at the [`LoopbackCallbackServer`], scoped to a nonce that is
//! fresh for every popup. The tab cannot be inspected
//! directly: its location reads as cross-origin until the loopback server
//! has seen the callback request, and a tab closed by the user goes
//! unnoticed, leaving the handshake to settle by message or timeout.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gametout_common::auth::{CrossOriginAccess, PopupFeatures, PopupOpener, PopupWindow};
use tracing::{debug, info, warn};
use url::Url;

use super::loopback::LoopbackCallbackServer;

/// Query parameter carrying the loopback callback URL to the backend.
pub const REDIRECT_URI_PARAM: &str = "redirect_uri";

type Launcher = dyn Fn(&Url) -> io::Result<()> + Send + Sync;

/// Opens handshake popups as system browser tabs.
pub struct SystemBrowserOpener {
    server: Arc<LoopbackCallbackServer>,
    launcher: Arc<Launcher>,
}

impl SystemBrowserOpener {
    /// Opener that launches URLs with the platform's default browser.
    pub fn new(server: Arc<LoopbackCallbackServer>) -> Self {
        Self::with_launcher(server, |url: &Url| open::that(url.as_str()))
    }

    /// Opener with a custom launch step, e.g. printing the URL instead.
    pub fn with_launcher<F>(server: Arc<LoopbackCallbackServer>, launcher: F) -> Self
    where
        F: Fn(&Url) -> io::Result<()> + Send + Sync + 'static,
    {
        Self { server, launcher: Arc::new(launcher) }
    }

    #[must_use]
    pub fn server(&self) -> &Arc<LoopbackCallbackServer> {
        &self.server
    }

    fn popup_url(&self, url: &Url, callback: &Url) -> Url {
        let mut popup_url = url.clone();
        popup_url.query_pairs_mut().append_pair(REDIRECT_URI_PARAM, callback.as_str());
        popup_url
    }
}

impl fmt::Debug for SystemBrowserOpener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemBrowserOpener").field("origin", self.server.origin()).finish()
    }
}

impl PopupOpener for SystemBrowserOpener {
    fn open(&self, url: &Url, features: &PopupFeatures) -> Option<Box<dyn PopupWindow>> {
        let callback = self.server.begin_handshake();
        let popup_url = self.popup_url(url, &callback);

        debug!(features = %features.to_feature_string(), "Browser tabs ignore window features");
        match (self.launcher)(&popup_url) {
            Ok(()) => {
                info!(url = %url, "Opened login page in system browser");
                Some(Box::new(BrowserPopup {
                    server: self.server.clone(),
                    closed: AtomicBool::new(false),
                }))
            }
            Err(err) => {
                warn!(error = %err, "Could not launch system browser");
                None
            }
        }
    }
}

/// A login page open in the system browser.
pub struct BrowserPopup {
    server: Arc<LoopbackCallbackServer>,
    closed: AtomicBool,
}

impl PopupWindow for BrowserPopup {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn location(&self) -> Result<Url, CrossOriginAccess> {
        self.server.visited_callback().ok_or(CrossOriginAccess)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use gametout_common::auth::MessageBus;
    use parking_lot::Mutex;

    use super::*;

    async fn server() -> Arc<LoopbackCallbackServer> {
        Arc::new(LoopbackCallbackServer::start("/oauth2/callback", MessageBus::new()).await.unwrap())
    }

    fn redirect_of(launched: &Url) -> Url {
        launched
            .query_pairs()
            .find(|(key, _)| key == REDIRECT_URI_PARAM)
            .map(|(_, value)| Url::parse(&value).unwrap())
            .unwrap()
    }

    fn features() -> PopupFeatures {
        PopupFeatures { width: 500, height: 600, left: 0, top: 0 }
    }

    #[tokio::test]
    async fn appends_redirect_uri_to_login_url() {
        let server = server().await;
        let launched = Arc::new(Mutex::new(Vec::new()));
        let sink = launched.clone();
        let opener = SystemBrowserOpener::with_launcher(server.clone(), move |url: &Url| {
            sink.lock().push(url.clone());
            Ok(())
        });

        let login = Url::parse("https://api.example.com/oauth2/login/discord").unwrap();
        assert!(opener.open(&login, &features()).is_some());
        assert!(opener.open(&login, &features()).is_some());

        let launched = launched.lock();
        let first = redirect_of(&launched[0]);
        let second = redirect_of(&launched[1]);
        assert_eq!(first.origin(), server.origin().origin());
        assert!(first.path().starts_with("/oauth2/callback/"));
        assert_ne!(first, second, "each popup gets its own callback nonce");
        assert_eq!(launched[0].path(), "/oauth2/login/discord");
    }

    #[tokio::test]
    async fn launch_failure_reads_as_blocked() {
        let opener = SystemBrowserOpener::with_launcher(server().await, |_: &Url| {
            Err(io::Error::new(io::ErrorKind::NotFound, "no browser"))
        });

        let login = Url::parse("https://api.example.com/oauth2/login/steam").unwrap();
        assert!(opener.open(&login, &features()).is_none());
    }

    #[tokio::test]
    async fn location_is_cross_origin_until_callback_visited() {
        let server = server().await;
        let launched = Arc::new(Mutex::new(None));
        let sink = launched.clone();
        let opener = SystemBrowserOpener::with_launcher(server.clone(), move |url: &Url| {
            *sink.lock() = Some(redirect_of(url));
            Ok(())
        });
        let login = Url::parse("https://api.example.com/oauth2/login/steam").unwrap();
        let popup = opener.open(&login, &features()).unwrap();

        assert_eq!(popup.location(), Err(CrossOriginAccess));

        // Another caller guessing at the callback path does not move the popup.
        reqwest::get(server.origin().join("/oauth2/callback/guess?token=x&provider=steam").unwrap())
            .await
            .unwrap();
        assert_eq!(popup.location(), Err(CrossOriginAccess));

        let callback = launched.lock().clone().unwrap();
        reqwest::get(format!("{callback}?token=t&provider=steam")).await.unwrap();
        assert_eq!(popup.location().unwrap().path(), callback.path());

        assert!(!popup.is_closed());
        popup.close();
        assert!(popup.is_closed());
    }
}
