//! Command-line arguments and path resolution

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// OIDC login
///
/// Signs in against an OpenID Connect provider with the implicit flow. Run
/// `authorize`, open the printed URL, then pass the URL the browser was
/// redirected to to `callback`.
#[derive(Parser, Debug)]
#[clap(name = "oidc-login")]
pub struct Cli {
    /// Client configuration file [env: CONFIG_PATH] [default: oidc-login.toml]
    #[clap(long = "config", global = true)]
    pub config_path: Option<String>,

    /// Request state file [env: OIDC_STATE_FILE] [default: oidc-state.json]
    #[clap(long = "state-file", global = true)]
    pub state_file: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print the provider authorization URL.
    Authorize(Authorize),

    /// Validate the redirect URL and print the session.
    Callback(Callback),

    /// Print the provider sign-out URL.
    Logout(Logout),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Authorize {
    #[clap(long = "login-hint")]
    pub login_hint: Option<String>,

    #[clap(long = "prompt")]
    pub prompt: Option<String>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Callback {
    /// Redirect URL, including its fragment or query
    pub url: String,

    /// Include the identity and access tokens in the output
    #[clap(long = "show-tokens")]
    pub show_tokens: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Logout {
    #[clap(long = "id-token-hint")]
    pub id_token_hint: Option<String>,
}

/// Config path: CLI arg > `CONFIG_PATH` env > `oidc-login.toml`
pub fn resolve_config_path(cli_path: Option<&str>) -> PathBuf {
    resolve(cli_path, "CONFIG_PATH", "oidc-login.toml")
}

/// State file path: CLI arg > `OIDC_STATE_FILE` env > `oidc-state.json`
pub fn resolve_state_path(cli_path: Option<&str>) -> PathBuf {
    resolve(cli_path, "OIDC_STATE_FILE", "oidc-state.json")
}

fn resolve(cli_path: Option<&str>, env_var: &str, default: &str) -> PathBuf {
    if let Some(p) = cli_path {
        return PathBuf::from(p);
    }
    if let Ok(p) = std::env::var(env_var) {
        return PathBuf::from(p);
    }
    PathBuf::from(default)
}
