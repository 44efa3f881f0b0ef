//! Popup window abstraction and the cross-window message channel
//!
//! The handshake never talks to a concrete window system. It opens a popup
//! through a [`PopupOpener`], observes it through [`PopupWindow`] and listens
//! for callback messages on a [`MessageBus`]. The infra crate provides the
//! system-browser rendition; tests drive scripted fakes.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;
use url::{Origin, Url};

/// Capacity of the message channel. Messages are tiny and consumed at once.
const MESSAGE_BUS_CAPACITY: usize = 64;

/// Raised when a popup's location cannot be read because it currently shows
/// a page from another origin (the provider's consent screen).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossOriginAccess;

impl fmt::Display for CrossOriginAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("popup location is on a foreign origin")
    }
}

impl std::error::Error for CrossOriginAccess {}

/// Handle to an opened popup window.
pub trait PopupWindow: Send + Sync {
    /// Whether the window has been closed, by the user or by [`close`].
    ///
    /// [`close`]: PopupWindow::close
    fn is_closed(&self) -> bool;

    /// The window's current location.
    ///
    /// # Errors
    /// Returns [`CrossOriginAccess`] while the window shows a foreign page.
    fn location(&self) -> Result<Url, CrossOriginAccess>;

    /// Close the window. Closing an already closed window is a no-op.
    fn close(&self);
}

/// Opens popup windows.
pub trait PopupOpener: Send + Sync {
    /// Open `url` in a new popup positioned by `features`.
    ///
    /// Returns `None` when the environment refuses to create the window.
    fn open(&self, url: &Url, features: &PopupFeatures) -> Option<Box<dyn PopupWindow>>;
}

/// Area of the screen the popup is centered within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self { left: 0, top: 0, width: 1920, height: 1080 }
    }
}

/// Size and position requested for a popup window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupFeatures {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
}

impl PopupFeatures {
    /// Center a `width` x `height` popup within `screen`.
    #[must_use]
    pub fn centered(screen: &ScreenGeometry, width: u32, height: u32) -> Self {
        let offset = |outer: u32, inner: u32| (i64::from(outer) - i64::from(inner)) / 2;
        let left = i64::from(screen.left) + offset(screen.width, width);
        let top = i64::from(screen.top) + offset(screen.height, height);

        Self {
            width,
            height,
            left: i32::try_from(left).unwrap_or(screen.left),
            top: i32::try_from(top).unwrap_or(screen.top),
        }
    }

    /// Window feature string in the `width=..,height=..,left=..,top=..` form.
    #[must_use]
    pub fn to_feature_string(&self) -> String {
        format!(
            "width={},height={},left={},top={},scrollbars=yes",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Result of probing a popup's location on one poll tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationProbe {
    /// Same origin and on the callback path.
    Callback(Url),
    /// Same origin, some other path.
    SameOrigin(Url),
    /// Location unreadable, or readable but on another origin.
    CrossOrigin,
}

impl LocationProbe {
    /// Classify the popup's current location against the application origin.
    #[must_use]
    pub fn probe(popup: &dyn PopupWindow, app_origin: &Origin, callback_path: &str) -> Self {
        match popup.location() {
            Ok(url) => Self::classify(url, app_origin, callback_path),
            Err(CrossOriginAccess) => Self::CrossOrigin,
        }
    }

    #[must_use]
    pub fn classify(url: Url, app_origin: &Origin, callback_path: &str) -> Self {
        if &url.origin() != app_origin {
            Self::CrossOrigin
        } else if url.path().contains(callback_path) {
            Self::Callback(url)
        } else {
            Self::SameOrigin(url)
        }
    }
}

/// A message posted to the application window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowMessage {
    /// ASCII serialization of the sender's origin, e.g. `http://127.0.0.1:4711`.
    pub origin: String,
    pub data: serde_json::Value,
}

impl WindowMessage {
    #[must_use]
    pub fn new(origin: impl Into<String>, data: serde_json::Value) -> Self {
        Self { origin: origin.into(), data }
    }
}

/// Broadcast channel carrying [`WindowMessage`]s to every active listener.
#[derive(Debug, Clone)]
pub struct MessageBus {
    sender: broadcast::Sender<WindowMessage>,
}

impl MessageBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(MESSAGE_BUS_CAPACITY);
        Self { sender }
    }

    /// Deliver `message` to every listener. Returns how many received it.
    pub fn post(&self, message: WindowMessage) -> usize {
        self.sender.send(message).unwrap_or(0)
    }

    /// Register a listener. Dropping the subscription unregisters it.
    #[must_use]
    pub fn subscribe(&self) -> MessageSubscription {
        MessageSubscription { receiver: self.sender.subscribe() }
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Live registration on a [`MessageBus`].
#[derive(Debug)]
pub struct MessageSubscription {
    receiver: broadcast::Receiver<WindowMessage>,
}

impl MessageSubscription {
    /// Wait for the next message. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<WindowMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Message listener lagged; dropped messages");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(url: &str) -> Origin {
        Url::parse(url).unwrap().origin()
    }

    #[test]
    fn centers_popup_within_screen() {
        let screen = ScreenGeometry { left: 0, top: 0, width: 1920, height: 1080 };
        let features = PopupFeatures::centered(&screen, 500, 600);

        assert_eq!(features.left, 710);
        assert_eq!(features.top, 240);
        assert_eq!(features.to_feature_string(), "width=500,height=600,left=710,top=240,scrollbars=yes");
    }

    #[test]
    fn centering_respects_screen_offset() {
        let screen = ScreenGeometry { left: 1920, top: 100, width: 1280, height: 800 };
        let features = PopupFeatures::centered(&screen, 500, 600);

        assert_eq!(features.left, 1920 + 390);
        assert_eq!(features.top, 200);
    }

    #[test]
    fn classifies_callback_location() {
        let app = origin("http://127.0.0.1:4711");
        let url = Url::parse("http://127.0.0.1:4711/oauth2/callback?token=t").unwrap();

        assert_eq!(
            LocationProbe::classify(url.clone(), &app, "/oauth2/callback"),
            LocationProbe::Callback(url)
        );
    }

    #[test]
    fn classifies_same_origin_non_callback() {
        let app = origin("http://127.0.0.1:4711");
        let url = Url::parse("http://127.0.0.1:4711/loading").unwrap();

        assert_eq!(
            LocationProbe::classify(url.clone(), &app, "/oauth2/callback"),
            LocationProbe::SameOrigin(url)
        );
    }

    #[test]
    fn foreign_origin_is_cross_origin_even_on_callback_path() {
        let app = origin("http://127.0.0.1:4711");
        let url = Url::parse("https://evil.example.com/oauth2/callback?token=t").unwrap();

        assert_eq!(LocationProbe::classify(url, &app, "/oauth2/callback"), LocationProbe::CrossOrigin);
    }

    #[tokio::test]
    async fn dropping_subscription_unregisters_listener() {
        let bus = MessageBus::new();
        let mut subscription = bus.subscribe();
        assert_eq!(bus.listener_count(), 1);

        bus.post(WindowMessage::new("http://a", serde_json::json!({"n": 1})));
        let received = subscription.recv().await.unwrap();
        assert_eq!(received.data["n"], 1);

        drop(subscription);
        assert_eq!(bus.listener_count(), 0);
        assert_eq!(bus.post(WindowMessage::new("http://a", serde_json::Value::Null)), 0);
    }
}
