//! Application constants
//!
//! Centralized location for identity-related constants shared by the
//! handshake coordinator, the credential store and the API client.

// Handshake
pub const CALLBACK_MESSAGE_TYPE: &str = "OAUTH2_CALLBACK";
pub const DEFAULT_CALLBACK_PATH: &str = "/oauth2/callback";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_POPUP_WIDTH: u32 = 500;
pub const DEFAULT_POPUP_HEIGHT: u32 = 600;

// Backend endpoints (relative to the API base)
pub const OAUTH2_LOGIN_PATH: &str = "/oauth2/login";
pub const OAUTH2_LINK_PATH: &str = "/oauth2/link";
pub const OAUTH2_UNLINK_PATH: &str = "/oauth2/unlink";
pub const OAUTH2_LINKED_ACCOUNTS_PATH: &str = "/oauth2/linked-accounts";

// Persisted client state. Written and cleared as a pair.
pub const TOKEN_STORAGE_KEY: &str = "oauth2_token";
pub const PROVIDER_STORAGE_KEY: &str = "oauth2_provider";
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "GameTout.oauth2";

// API client
pub const DEFAULT_API_BASE: &str = "http://localhost:8080";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
