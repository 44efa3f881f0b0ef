//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `GAMETOUT_API_BASE` is not set, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//! 5. With neither source available, built-in defaults apply
//! 6. In the file/default case, the optional variables below still override
//!    the values they name
//!
//! ## Environment Variables
//! - `GAMETOUT_API_BASE`: API base URL (required for env loading)
//! - `GAMETOUT_API_TIMEOUT_SECS`: Request timeout in seconds
//! - `GAMETOUT_OAUTH_POLL_INTERVAL_MS`: Popup location poll interval
//! - `GAMETOUT_OAUTH_TIMEOUT_SECS`: Overall handshake timeout
//! - `GAMETOUT_OAUTH_CALLBACK_PATH`: Same-origin callback path
//! - `GAMETOUT_KEYCHAIN_SERVICE`: Keychain service name for the credential
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./gametout.json` or `./gametout.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use gametout_domain::{ApiConfig, Config, GameToutError, Result};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables, then from a probed
/// config file. When no file exists either, defaults are used. Optional
/// environment variables override file and default values alike.
///
/// # Errors
/// Returns `GameToutError::Config` if an environment value or a config file
/// is present but invalid
pub fn load() -> Result<Config> {
    if std::env::var("GAMETOUT_API_BASE").is_ok() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    let config = match probe_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::info!("No configuration found; using defaults");
            Config::default()
        }
    };

    apply_env_overrides(config)
}

/// Load configuration from environment variables
///
/// `GAMETOUT_API_BASE` is required; every other variable falls back to its
/// default when unset.
///
/// # Errors
/// Returns `GameToutError::Config` if the base URL is missing or a numeric
/// variable does not parse.
pub fn load_from_env() -> Result<Config> {
    let base_url = env_var("GAMETOUT_API_BASE")?;
    let config = Config {
        api: ApiConfig { base_url, ..ApiConfig::default() },
        ..Config::default()
    };

    apply_env_overrides(config)
}

/// Overlay the optional `GAMETOUT_*` variables onto `config`.
///
/// Unset variables leave the corresponding field untouched.
///
/// # Errors
/// Returns `GameToutError::Config` if a numeric variable does not parse.
pub fn apply_env_overrides(mut config: Config) -> Result<Config> {
    config.api.timeout_seconds =
        env_parse("GAMETOUT_API_TIMEOUT_SECS", config.api.timeout_seconds)?;
    config.oauth.poll_interval_ms =
        env_parse("GAMETOUT_OAUTH_POLL_INTERVAL_MS", config.oauth.poll_interval_ms)?;
    config.oauth.timeout_seconds =
        env_parse("GAMETOUT_OAUTH_TIMEOUT_SECS", config.oauth.timeout_seconds)?;

    if let Ok(path) = std::env::var("GAMETOUT_OAUTH_CALLBACK_PATH") {
        tracing::debug!(key = "GAMETOUT_OAUTH_CALLBACK_PATH", "Applied environment override");
        config.oauth.callback_path = path;
    }
    if let Ok(service) = std::env::var("GAMETOUT_KEYCHAIN_SERVICE") {
        tracing::debug!(key = "GAMETOUT_KEYCHAIN_SERVICE", "Applied environment override");
        config.storage.keychain_service = service;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `GameToutError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(GameToutError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            GameToutError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| GameToutError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| GameToutError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| GameToutError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(GameToutError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
        candidates.push(cwd.join("../config.json"));
        candidates.push(cwd.join("../config.toml"));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> [PathBuf; 4] {
    [
        dir.join("gametout.json"),
        dir.join("gametout.toml"),
        dir.join("config.json"),
        dir.join("config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `GameToutError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        GameToutError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional environment variable, falling back to `default`.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => {
            tracing::debug!(key, "Applied environment override");
            raw.trim()
                .parse::<T>()
                .map_err(|e| GameToutError::Config(format!("Invalid value for {}: {}", key, e)))
        }
        Err(_) => Ok(default),
    }
}
