//! Secret storage primitives
//!
//! The credential store persists its entries through a [`SecretStore`]
//! backend: the platform keychain in production, an in-memory map where no
//! keychain exists (tests, headless CI).

#[cfg(feature = "platform")]
pub mod keychain;
pub mod secrets;

#[cfg(feature = "platform")]
pub use keychain::KeychainProvider;
pub use secrets::{KeychainError, MemorySecretStore, SecretStore};
