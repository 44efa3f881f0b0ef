//! Third-party OAuth2 login via a backend-mediated popup handshake
//!
//! The GameTout backend performs the actual OAuth2 exchange with Discord,
//! Steam or LinkedIn. The client only opens the backend's login page in a
//! popup and waits for the backend to hand back a bearer token.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │ OAuth2LoginService │  login / logout / current provider
//! └─────────┬──────────┘
//!           │
//!           ├──► HandshakeCoordinator  (popup + message/poll/timeout race)
//!           │         │
//!           │         ├──► PopupOpener / PopupWindow  (window system seam)
//!           │         └──► MessageBus                 (OAUTH2_CALLBACK messages)
//!           │
//!           └──► CredentialStore       (token + provider pair)
//!                     │
//!                     └──► SecretStore (keychain or memory)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gametout_common::auth::{
//!     HandshakeConfig, HandshakeCoordinator, MemoryCredentialStore, MessageBus,
//!     OAuth2LoginService, PopupOpener,
//! };
//! use gametout_domain::Provider;
//!
//! # async fn run(opener: Arc<dyn PopupOpener>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = HandshakeConfig::new("https://api.gametout.example", "http://127.0.0.1:4711")?;
//! let coordinator = HandshakeCoordinator::new(config, opener, MessageBus::new())?;
//! let service = OAuth2LoginService::new(
//!     Arc::new(coordinator),
//!     Arc::new(MemoryCredentialStore::in_memory()),
//! );
//!
//! let outcome = service.login(Provider::Discord).await?;
//! println!("signed in with {} (new account: {})", outcome.provider, outcome.new_user);
//! # Ok(())
//! # }
//! ```

pub mod callback;
pub mod handshake;
pub mod popup;
pub mod service;
pub mod store;

pub use callback::CallbackParams;
pub use handshake::{
    HandshakeConfig, HandshakeCoordinator, HandshakeError, HandshakeOutcome, HandshakeRequest,
};
pub use popup::{
    CrossOriginAccess, LocationProbe, MessageBus, MessageSubscription, PopupFeatures, PopupOpener,
    PopupWindow, ScreenGeometry, WindowMessage,
};
pub use service::{LoginOutcome, OAuth2LoginService, OAuth2ServiceError};
#[cfg(feature = "platform")]
pub use store::KeychainCredentialStore;
pub use store::{CredentialStore, MemoryCredentialStore, SecretCredentialStore, StoreError};
