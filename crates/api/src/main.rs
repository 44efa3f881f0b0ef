//! GameTout CLI
//!
//! Sign in with a third-party provider, inspect the stored credential and
//! manage linked accounts.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gametout_app::utils::logging::init_tracing;
use gametout_app::{commands, AppContext};
use gametout_domain::Provider;

#[derive(Debug, Parser)]
#[command(name = "gametout", version, about = "GameTout account sign-in")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in through a provider's login page
    Login {
        #[arg(value_parser = parse_provider)]
        provider: Provider,
    },
    /// Forget the stored provider credential
    Logout,
    /// Show which provider the client is signed in with
    Status,
    /// List provider identities linked to this account
    LinkedAccounts,
    /// Link another provider identity to this account
    Link {
        #[arg(value_parser = parse_provider)]
        provider: Provider,
    },
    /// Detach a provider identity from this account
    Unlink {
        #[arg(value_parser = parse_provider)]
        provider: Provider,
    },
}

fn parse_provider(value: &str) -> std::result::Result<Provider, String> {
    value.parse().map_err(|err: gametout_domain::GameToutError| err.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env before tracing so RUST_LOG from the file applies
    let dotenv = dotenvy::dotenv();
    init_tracing(cli.verbose);
    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
        Err(err) => tracing::debug!(error = %err, "No .env file loaded"),
    }

    let ctx = AppContext::new().context("failed to initialize GameTout")?;

    match cli.command {
        Command::Login { provider } => {
            println!("Opening {} sign-in in your browser...", provider.display_name());
            let outcome = commands::login(&ctx, provider).await?;
            let greeting = if outcome.new_user { "Welcome to GameTout" } else { "Welcome back" };
            println!("{greeting}! Signed in with {}.", outcome.provider.display_name());
        }
        Command::Logout => {
            commands::logout(&ctx).await?;
            println!("Signed out.");
        }
        Command::Status => {
            let status = commands::status(&ctx).await?;
            match status.provider {
                Some(provider) => println!("Signed in with {}.", provider.display_name()),
                None if status.first_party_session => {
                    println!("Using the GameTout session (no provider sign-in).");
                }
                None => println!("Not signed in."),
            }
            println!("API: {}", status.api_base);
        }
        Command::LinkedAccounts => {
            let accounts = commands::linked_accounts(&ctx).await?;
            if accounts.is_empty() {
                println!("No linked accounts.");
            }
            for account in accounts {
                let name = account
                    .provider_username
                    .or(account.provider_email)
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<10} {:<30} linked {}",
                    account.provider.display_name(),
                    name,
                    account.linked_at
                );
            }
        }
        Command::Link { provider } => {
            let url = commands::link(&ctx, provider).await?;
            println!("Continue linking {} in your browser:\n  {url}", provider.display_name());
        }
        Command::Unlink { provider } => {
            commands::unlink(&ctx, provider).await?;
            println!("Unlinked {}.", provider.display_name());
        }
    }

    Ok(())
}
