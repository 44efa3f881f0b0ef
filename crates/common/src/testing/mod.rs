//! Testing utilities and helpers
//!
//! Scriptable stand-ins for the window system seams of the handshake:
//! - **[`FakePopup`]**: a popup whose location and closed state tests drive
//! - **[`FakePopupOpener`]**: hands out a [`FakePopup`] or simulates a blocker
//!
//! ## Usage
//!
//! ```ignore
//! use gametout_common::testing::{FakePopup, FakePopupOpener};
//!
//! let popup = FakePopup::new();
//! let opener = FakePopupOpener::new(popup.clone());
//! popup.navigate("http://127.0.0.1:4711/oauth2/callback?token=t&provider=steam");
//! assert_eq!(opener.open_count(), 0);
//! ```

pub mod mocks;

pub use mocks::{FakePopup, FakePopupOpener};
