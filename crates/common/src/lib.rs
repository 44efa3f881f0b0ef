//! Shared identity building blocks for GameTout clients.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `runtime`: popup handshake coordinator, callback parsing, credential
//!   store abstraction and the in-memory store
//! - `platform`: OS keychain backed credential persistence
//! - `test-utils`: scriptable popups and openers for handshake tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod auth;
#[cfg(feature = "runtime")]
pub mod security;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(all(feature = "runtime", any(feature = "test-utils", test)))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use auth::{
    CallbackParams, CredentialStore, HandshakeConfig, HandshakeCoordinator, HandshakeError,
    MemoryCredentialStore, OAuth2LoginService, StoreError,
};
#[cfg(feature = "platform")]
pub use auth::KeychainCredentialStore;
#[cfg(feature = "platform")]
pub use security::{KeychainError, KeychainProvider};
