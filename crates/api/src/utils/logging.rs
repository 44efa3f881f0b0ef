use std::time::Duration;

use gametout_domain::GameToutError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the log output format (`json` or text).
pub const LOG_FORMAT_ENV: &str = "GAMETOUT_LOG_FORMAT";

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` (default `info`, or `debug` when
/// `verbose`). Uses `try_init` so repeated calls are harmless.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::fmt;

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    let result = if json {
        fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().try_init()
    } else {
        fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).try_init()
    };
    drop(result);
}

/// Log the outcome of a command execution with structured fields.
///
/// Callers must avoid forwarding tokens or other secrets in `command`.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error: Option<&GameToutError>) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match error {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(err) => {
            warn!(command, duration_ms, error_type = error_label(err), "command_execution_failure");
        }
    }
}

/// Convert a `GameToutError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &GameToutError) -> &'static str {
    match error {
        GameToutError::Config(_) => "config",
        GameToutError::Platform(_) => "platform",
        GameToutError::Network(_) => "network",
        GameToutError::Auth(_) => "auth",
        GameToutError::Security(_) => "security",
        GameToutError::NotFound(_) => "not_found",
        GameToutError::InvalidInput(_) => "invalid_input",
        GameToutError::Internal(_) => "internal",
    }
}
