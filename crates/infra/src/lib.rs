//! # GameTout Infrastructure
//!
//! I/O-bound implementations behind the identity flow.
//!
//! This crate contains:
//! - Configuration loading (environment, JSON/TOML files)
//! - HTTP transport and the GameTout API client
//! - Per-request bearer credential resolution
//! - The loopback callback server and system-browser popup
//!
//! ## Architecture
//! - Implements the popup and credential seams defined in `gametout-common`
//! - Depends on `gametout-domain` and `gametout-common`
//! - Contains all "impure" code (network, browser launch, keychain)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod popup;

// Re-export commonly used items
pub use api::{
    AccessTokenProvider, ApiClient, ApiClientConfig, ApiError, CredentialResolver,
    EnvSessionToken, OAuth2Api, SessionTokenSource,
};
pub use errors::InfraError;
pub use http::HttpClient;
pub use popup::{LoopbackCallbackServer, SystemBrowserOpener};
