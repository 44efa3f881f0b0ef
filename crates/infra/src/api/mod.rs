//! GameTout API client
//!
//! - [`auth`]: per-request bearer credential resolution
//! - [`client`]: single-attempt JSON client that attaches the resolved token
//! - [`oauth2`]: account-linking endpoints
//! - [`errors`]: error classification

pub mod auth;
pub mod client;
pub mod errors;
pub mod oauth2;

pub use auth::{
    AccessTokenProvider, CredentialResolver, EnvSessionToken, NoSession, SessionTokenSource,
    SESSION_TOKEN_ENV,
};
pub use client::{ApiClient, ApiClientBuilder, ApiClientConfig};
pub use errors::{ApiError, ApiErrorCategory};
pub use oauth2::OAuth2Api;
