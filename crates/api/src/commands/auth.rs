//! Sign-in commands: login, logout and status

use std::time::Instant;

use gametout_common::auth::LoginOutcome;
use gametout_domain::{GameToutError, Provider, Result as DomainResult};
use serde::Serialize;
use tracing::info;

use crate::context::AppContext;
use crate::utils::logging::log_command_execution;

/// Snapshot of what the client is signed in with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    /// Provider of the stored third-party credential, if any.
    pub provider: Option<Provider>,
    /// Whether a first-party session is available as a fallback.
    pub first_party_session: bool,
    pub api_base: String,
}

/// Sign in through `provider`'s popup and persist the credential.
///
/// # Errors
/// Returns `GameToutError::Auth` when the handshake fails or is cancelled
/// and `GameToutError::Security` when the credential cannot be stored.
pub async fn login(ctx: &AppContext, provider: Provider) -> DomainResult<LoginOutcome> {
    let command_name = "auth::login";
    let start = Instant::now();
    info!(command = command_name, provider = %provider, "Executing login");

    let result: DomainResult<_> = async {
        let service = ctx.login_service().await?;
        service.login(provider).await.map_err(GameToutError::from)
    }
    .await;

    log_command_execution(command_name, start.elapsed(), result.as_ref().err());
    result
}

/// Forget the stored third-party credential.
///
/// # Errors
/// Returns `GameToutError::Security` if the credential store cannot be cleared
pub async fn logout(ctx: &AppContext) -> DomainResult<()> {
    let command_name = "auth::logout";
    let start = Instant::now();

    let result = ctx.credentials.clear().await.map_err(GameToutError::from);

    log_command_execution(command_name, start.elapsed(), result.as_ref().err());
    result
}

/// Report the active provider and first-party session state.
///
/// # Errors
/// Returns `GameToutError::Security` if the credential store cannot be read
pub async fn status(ctx: &AppContext) -> DomainResult<AuthStatus> {
    let command_name = "auth::status";
    let start = Instant::now();

    let result: DomainResult<_> = async {
        let provider = ctx.credentials.provider().await?;
        Ok(AuthStatus {
            provider,
            first_party_session: ctx.session.is_active().await,
            api_base: ctx.config.api.base_url.clone(),
        })
    }
    .await;

    log_command_execution(command_name, start.elapsed(), result.as_ref().err());
    result
}
