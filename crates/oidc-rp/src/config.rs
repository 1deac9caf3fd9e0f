//! Client configuration
//!
//! `ClientConfig` is the single typed source of relying-party settings. It
//! can be built in code (`ClientConfig::new`) or loaded from TOML
//! (`ClientConfig::load`). Request-time `AuthorizeOptions` are merged over it
//! once, before an authorization URL is assembled:
//!
//! request-supplied option > `[request]` section > `[client]` section
//!
//! `OIDC_CLIENT_ID` in the environment overrides `client.client_id` from the
//! file, so one config can be shared across registrations.

use std::path::Path;

use oidc_transport::FetchOptions;
use serde::Deserialize;

use crate::constants::{DEFAULT_RESPONSE_TYPE, DEFAULT_SCOPE, DEFAULT_STATE_KEY};
use crate::metadata::{ProviderMetadata, SigningKeySet};

/// Root configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub client: ClientSettings,
    #[serde(default)]
    pub provider: ProviderSettings,
    /// Defaults for optional authorization request parameters
    #[serde(default)]
    pub request: AuthorizeOptions,
    #[serde(default)]
    pub transport: FetchOptions,
}

/// Registration of this client with the provider
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    #[serde(default)]
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default = "default_response_type")]
    pub response_type: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default)]
    pub post_logout_redirect_uri: Option<String>,
    /// Key the request state is stored under between redirect and callback
    #[serde(default = "default_state_key")]
    pub state_key: String,
    /// Strip protocol claims (nonce, at_hash, iat, ...) from the delivered profile
    #[serde(default = "default_true")]
    pub filter_protocol_claims: bool,
    /// Merge userinfo endpoint claims into the profile when an access token is available
    #[serde(default = "default_true")]
    pub load_user_info: bool,
}

/// Where provider metadata and keys come from.
///
/// Explicit endpoints win over discovered ones. `metadata` and
/// `signing_keys` pre-seed the caches and skip the network entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub authority: Option<String>,
    /// Full discovery URL, when it is not `{authority}/.well-known/openid-configuration`
    #[serde(default)]
    pub metadata_url: Option<String>,
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub metadata: Option<ProviderMetadata>,
    #[serde(default)]
    pub signing_keys: Option<SigningKeySet>,
}

/// Optional authorization request parameters.
///
/// Used both as the `[request]` defaults in configuration and as per-call
/// overrides passed to `build_authentication_request`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeOptions {
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub response_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub max_age: Option<u64>,
    #[serde(default)]
    pub ui_locales: Option<String>,
    #[serde(default)]
    pub id_token_hint: Option<String>,
    #[serde(default)]
    pub login_hint: Option<String>,
    #[serde(default)]
    pub acr_values: Option<String>,
    #[serde(default)]
    pub response_mode: Option<String>,
}

/// Authorization parameters after precedence has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizeParams {
    pub client_id: String,
    pub redirect_uri: String,
    pub response_type: String,
    pub scope: String,
    pub prompt: Option<String>,
    pub display: Option<String>,
    pub max_age: Option<u64>,
    pub ui_locales: Option<String>,
    pub id_token_hint: Option<String>,
    pub login_hint: Option<String>,
    pub acr_values: Option<String>,
    pub response_mode: Option<String>,
}

fn default_response_type() -> String {
    DEFAULT_RESPONSE_TYPE.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_state_key() -> String {
    DEFAULT_STATE_KEY.to_string()
}

fn default_true() -> bool {
    true
}

impl ClientConfig {
    /// Minimal configuration with every optional setting at its default.
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client: ClientSettings {
                client_id: client_id.into(),
                redirect_uri: redirect_uri.into(),
                response_type: default_response_type(),
                scope: default_scope(),
                post_logout_redirect_uri: None,
                state_key: default_state_key(),
                filter_protocol_claims: true,
                load_user_info: true,
            },
            provider: ProviderSettings::default(),
            request: AuthorizeOptions::default(),
            transport: FetchOptions::default(),
        }
    }

    /// Set the provider authority (issuer base URL used for discovery).
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.provider.authority = Some(authority.into());
        self
    }

    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;

        if let Ok(client_id) = std::env::var("OIDC_CLIENT_ID") {
            config.client.client_id = client_id;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML without environment overlay or validation.
    pub fn from_toml_str(contents: &str) -> common::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Reject configurations this client cannot act on.
    pub fn validate(&self) -> common::Result<()> {
        if self.client.client_id.trim().is_empty() {
            return Err(common::Error::Config(
                "client_id must be set in [client] or OIDC_CLIENT_ID".into(),
            ));
        }

        if self.client.redirect_uri.trim().is_empty() {
            return Err(common::Error::Config("redirect_uri must not be empty".into()));
        }

        let (oidc, oauth) = response_type_flags(&self.client.response_type);
        if !oidc && !oauth {
            return Err(common::Error::Config(format!(
                "response_type must request id_token and/or token, got: {}",
                self.client.response_type
            )));
        }

        if self.client.state_key.trim().is_empty() {
            return Err(common::Error::Config("state_key must not be empty".into()));
        }

        if self.transport.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl AuthorizeParams {
    /// Apply precedence: `options` over `config.request` over `config.client`.
    pub fn resolve(config: &ClientConfig, options: &AuthorizeOptions) -> Self {
        let defaults = &config.request;
        let pick = |over: &Option<String>, default: &Option<String>| {
            over.clone().or_else(|| default.clone())
        };

        Self {
            client_id: config.client.client_id.clone(),
            redirect_uri: pick(&options.redirect_uri, &defaults.redirect_uri)
                .unwrap_or_else(|| config.client.redirect_uri.clone()),
            response_type: pick(&options.response_type, &defaults.response_type)
                .unwrap_or_else(|| config.client.response_type.clone()),
            scope: pick(&options.scope, &defaults.scope)
                .unwrap_or_else(|| config.client.scope.clone()),
            prompt: pick(&options.prompt, &defaults.prompt),
            display: pick(&options.display, &defaults.display),
            max_age: options.max_age.or(defaults.max_age),
            ui_locales: pick(&options.ui_locales, &defaults.ui_locales),
            id_token_hint: pick(&options.id_token_hint, &defaults.id_token_hint),
            login_hint: pick(&options.login_hint, &defaults.login_hint),
            acr_values: pick(&options.acr_values, &defaults.acr_values),
            response_mode: pick(&options.response_mode, &defaults.response_mode),
        }
    }

    /// Whether the response type asks for an identity token / an access token.
    pub fn flow(&self) -> (bool, bool) {
        response_type_flags(&self.response_type)
    }

    /// Required then optional parameters, in URL order. `state` and `nonce`
    /// are prepended by the request builder.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let max_age = self.max_age.map(|v| v.to_string());
        [
            ("client_id", Some(&self.client_id)),
            ("redirect_uri", Some(&self.redirect_uri)),
            ("response_type", Some(&self.response_type)),
            ("scope", Some(&self.scope)),
            ("prompt", self.prompt.as_ref()),
            ("display", self.display.as_ref()),
            ("max_age", max_age.as_ref()),
            ("ui_locales", self.ui_locales.as_ref()),
            ("id_token_hint", self.id_token_hint.as_ref()),
            ("login_hint", self.login_hint.as_ref()),
            ("acr_values", self.acr_values.as_ref()),
            ("response_mode", self.response_mode.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| match value {
            Some(v) if !v.is_empty() => Some((name, v.clone())),
            _ => None,
        })
        .collect()
    }
}

/// Split a response type into (oidc, oauth) flags.
///
/// `id_token` marks an identity-token flow and `token` an access-token flow.
/// Both may be present (hybrid).
pub fn response_type_flags(response_type: &str) -> (bool, bool) {
    let mut oidc = false;
    let mut oauth = false;
    for token in response_type.split_whitespace() {
        match token {
            "id_token" => oidc = true,
            "token" => oauth = true,
            _ => {}
        }
    }
    (oidc, oauth)
}
