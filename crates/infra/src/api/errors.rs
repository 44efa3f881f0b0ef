//! API-specific error types
//!
//! Provides error classification for API operations.

use std::time::Duration;

use gametout_domain::GameToutError;
use thiserror::Error;

/// Categories of API errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Authentication errors (401, 403, missing credential)
    Authentication,
    /// Rate limiting errors (429)
    RateLimit,
    /// Server errors (5xx)
    Server,
    /// Client errors (4xx except auth)
    Client,
    /// Network/connection errors
    Network,
    /// Configuration errors
    Config,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Auth(_) => ApiErrorCategory::Authentication,
            Self::RateLimit(_) => ApiErrorCategory::RateLimit,
            Self::Server(_) => ApiErrorCategory::Server,
            Self::Client(_) => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// Whether the failure means the caller must sign in again.
    pub fn is_unauthorized(&self) -> bool {
        self.category() == ApiErrorCategory::Authentication
    }
}

impl From<GameToutError> for ApiError {
    fn from(err: GameToutError) -> Self {
        match err {
            GameToutError::Network(message) => Self::Network(message),
            GameToutError::Auth(message) | GameToutError::Security(message) => Self::Auth(message),
            GameToutError::Config(message) => Self::Config(message),
            GameToutError::NotFound(message) | GameToutError::InvalidInput(message) => {
                Self::Client(message)
            }
            GameToutError::Platform(message) | GameToutError::Internal(message) => {
                Self::Server(message)
            }
        }
    }
}

impl From<ApiError> for GameToutError {
    fn from(err: ApiError) -> Self {
        let message = err.to_string();
        match err.category() {
            ApiErrorCategory::Authentication => Self::Auth(message),
            ApiErrorCategory::Config => Self::Config(message),
            ApiErrorCategory::Client => Self::InvalidInput(message),
            ApiErrorCategory::RateLimit | ApiErrorCategory::Server | ApiErrorCategory::Network => {
                Self::Network(message)
            }
        }
    }
}
