//! Conversions from transport errors into domain errors.

use gametout_domain::GameToutError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub GameToutError);

impl From<InfraError> for GameToutError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<GameToutError> for InfraError {
    fn from(value: GameToutError) -> Self {
        Self(value)
    }
}

/// Classify a `reqwest` failure. Status-bearing errors keep their code in the
/// message; tokens and URLs with query strings never appear in it.
fn classify_http_error(err: HttpError) -> GameToutError {
    if err.is_timeout() {
        return GameToutError::Network("HTTP request timed out".into());
    }
    if err.is_connect() {
        return GameToutError::Network("HTTP connection failure".into());
    }
    if err.is_builder() {
        return GameToutError::InvalidInput("malformed HTTP request".into());
    }

    match err.status() {
        Some(status) => {
            let reason = status.canonical_reason().unwrap_or("unknown status");
            let message = format!("HTTP {} {}", status.as_u16(), reason);
            match status.as_u16() {
                401 | 403 => GameToutError::Auth(message),
                404 => GameToutError::NotFound(message),
                400..=499 => GameToutError::InvalidInput(message),
                _ => GameToutError::Network(message),
            }
        }
        None => GameToutError::Network(err.without_url().to_string()),
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(classify_http_error(value))
    }
}
