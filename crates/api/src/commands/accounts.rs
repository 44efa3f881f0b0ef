//! Account-linking commands

use std::time::Instant;

use gametout_domain::{LinkedAccount, Provider, Result as DomainResult};
use tracing::info;
use url::Url;

use crate::context::AppContext;
use crate::utils::logging::log_command_execution;

/// List the provider identities linked to the signed-in account.
///
/// # Errors
/// Returns `GameToutError::Auth` without a third-party sign-in, or the
/// mapped API failure.
pub async fn linked_accounts(ctx: &AppContext) -> DomainResult<Vec<LinkedAccount>> {
    let command_name = "accounts::linked_accounts";
    let start = Instant::now();

    let result: DomainResult<_> = ctx.oauth2.linked_accounts().await.map_err(Into::into);

    log_command_execution(command_name, start.elapsed(), result.as_ref().err());
    result
}

/// Fetch the authorization URL for linking `provider` and open it.
///
/// Returns the URL so the caller can show it if the browser did not open.
///
/// # Errors
/// Returns `GameToutError::Auth` without a third-party sign-in, or the
/// mapped API failure. A browser that fails to open is not an error.
pub async fn link(ctx: &AppContext, provider: Provider) -> DomainResult<Url> {
    let command_name = "accounts::link";
    let start = Instant::now();
    info!(command = command_name, provider = %provider, "Executing link");

    let result: DomainResult<_> = ctx.oauth2.link_url(provider).await.map_err(Into::into);
    if let Ok(url) = &result {
        if let Err(err) = ctx.open_in_browser(url) {
            tracing::warn!(error = %err, "Could not open link page");
        }
    }

    log_command_execution(command_name, start.elapsed(), result.as_ref().err());
    result
}

/// Detach `provider` from the signed-in account.
///
/// # Errors
/// Returns `GameToutError::Auth` without a third-party sign-in, or the
/// mapped API failure.
pub async fn unlink(ctx: &AppContext, provider: Provider) -> DomainResult<()> {
    let command_name = "accounts::unlink";
    let start = Instant::now();
    info!(command = command_name, provider = %provider, "Executing unlink");

    let result: DomainResult<_> = ctx.oauth2.unlink(provider).await.map_err(Into::into);

    log_command_execution(command_name, start.elapsed(), result.as_ref().err());
    result
}
