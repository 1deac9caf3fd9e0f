//! OIDC login CLI
//!
//! Drives an implicit-flow sign-in from a terminal:
//! 1. `authorize` prints the provider URL to open in a browser
//! 2. `callback <url>` validates the redirect the browser landed on
//! 3. `logout` prints the provider sign-out URL
//!
//! The request state survives between invocations in a file-backed store.

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use oidc_rp::{AuthorizeOptions, CallbackResult, ClientConfig, NormalizedSession, RelyingParty};
use oidc_transport::{FileStateStore, HttpFetcher};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Authorize, Callback, Cli, Command, Logout};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support.
    // Logs go to stderr so stdout carries only the command's result.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli::resolve_config_path(cli.config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = ClientConfig::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let state_path = cli::resolve_state_path(cli.state_file.as_deref());
    let store = FileStateStore::load(state_path.clone())
        .await
        .with_context(|| format!("failed to open state file {}", state_path.display()))?;

    let http = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let fetcher = HttpFetcher::new(http, config.transport.clone());

    info!(
        client_id = %config.client.client_id,
        response_type = %config.client.response_type,
        state_file = %state_path.display(),
        "configuration loaded"
    );

    let client = RelyingParty::new(config, Arc::new(fetcher), Arc::new(store));

    match cli.command {
        Command::Authorize(Authorize { login_hint, prompt }) => {
            let options = AuthorizeOptions {
                login_hint,
                prompt,
                ..Default::default()
            };
            let request = client
                .build_authentication_request(&options)
                .await
                .context("failed to build authorization request")?;
            println!("{}", request.authorization_url);
        }
        Command::Callback(Callback { url, show_tokens }) => {
            let session = client
                .process_response(Some(CallbackResult::from_url(&url)), None)
                .await
                .context("sign-in failed")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&session_json(&session, show_tokens))?
            );
        }
        Command::Logout(Logout { id_token_hint }) => {
            let request = client
                .build_sign_out_request(id_token_hint.as_deref(), None)
                .await
                .context("failed to build sign-out request")?;
            println!("{}", request.url);
        }
    }

    Ok(())
}

/// Render a session for stdout. Tokens are only included on request.
fn session_json(session: &NormalizedSession, show_tokens: bool) -> serde_json::Value {
    let mut output = json!({
        "profile": session.profile,
        "token_type": session.token_type,
        "expires_in": session.expires_in,
        "scope": session.scope,
        "session_state": session.session_state,
    });
    if show_tokens {
        output["id_token"] = json!(session.id_token.as_ref().map(|t| t.expose()));
        output["access_token"] = json!(session.access_token.as_ref().map(|t| t.expose()));
    }
    output
}
