//! Production popup: system browser plus loopback callback server

pub mod browser;
pub mod loopback;

pub use browser::{BrowserPopup, SystemBrowserOpener, REDIRECT_URI_PARAM};
pub use loopback::{LoopbackCallbackServer, MESSAGE_PATH};
