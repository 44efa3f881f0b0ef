//! Configuration structures
//!
//! Loaded by `gametout_infra::config` from environment variables or a
//! JSON/TOML file. Every section has defaults so a partial file is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE, DEFAULT_API_TIMEOUT_SECS, DEFAULT_CALLBACK_PATH,
    DEFAULT_HANDSHAKE_TIMEOUT_SECS, DEFAULT_KEYCHAIN_SERVICE, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_POPUP_HEIGHT, DEFAULT_POPUP_WIDTH,
};

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL for every API call (e.g. `https://api.example.com`)
    #[serde(default = "default_api_base")]
    pub base_url: String,
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,
}

impl ApiConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: default_api_base(), timeout_seconds: default_api_timeout() }
    }
}

/// Popup handshake settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_handshake_timeout")]
    pub timeout_seconds: u64,
    /// Same-origin path the backend redirects the popup to.
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
    #[serde(default = "default_popup_width")]
    pub popup_width: u32,
    #[serde(default = "default_popup_height")]
    pub popup_height: u32,
}

impl OAuthConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            timeout_seconds: default_handshake_timeout(),
            callback_path: default_callback_path(),
            popup_width: default_popup_width(),
            popup_height: default_popup_height(),
        }
    }
}

/// Credential persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Keychain service name the credential pair is stored under.
    #[serde(default = "default_keychain_service")]
    pub keychain_service: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { keychain_service: default_keychain_service() }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

const fn default_api_timeout() -> u64 {
    DEFAULT_API_TIMEOUT_SECS
}

const fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

const fn default_handshake_timeout() -> u64 {
    DEFAULT_HANDSHAKE_TIMEOUT_SECS
}

fn default_callback_path() -> String {
    DEFAULT_CALLBACK_PATH.to_string()
}

const fn default_popup_width() -> u32 {
    DEFAULT_POPUP_WIDTH
}

const fn default_popup_height() -> u32 {
    DEFAULT_POPUP_HEIGHT
}

fn default_keychain_service() -> String {
    DEFAULT_KEYCHAIN_SERVICE.to_string()
}
