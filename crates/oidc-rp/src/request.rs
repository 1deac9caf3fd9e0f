//! Authentication request construction
//!
//! Builds the provider authorization URL for an implicit (or hybrid) flow and
//! persists the per-attempt `RequestState` that the callback is checked
//! against. A fresh random `state` is generated for every request, and a
//! `nonce` whenever an identity token is requested.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::RelyingParty;
use crate::config::{AuthorizeOptions, AuthorizeParams};
use crate::constants::RANDOM_VALUE_BYTES;
use crate::error::{Error, Result};

/// What the relying party remembers between redirect and callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestState {
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// An identity token was requested
    #[serde(default)]
    pub oidc: bool,
    /// An access token was requested
    #[serde(default)]
    pub oauth: bool,
}

impl RequestState {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::StateStore(format!("cannot serialize request state: {e}")))
    }

    /// Parse a stored record. Anything unparsable is treated as absent.
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Output of `build_authentication_request`.
#[derive(Debug, Clone)]
pub struct AuthenticationRequest {
    pub request_state: RequestState,
    pub authorization_url: String,
}

/// Generate an unguessable value for `state` or `nonce`.
///
/// `RANDOM_VALUE_BYTES` random bytes, URL-safe base64 without padding.
pub fn generate_random_value() -> String {
    let mut bytes = [0u8; RANDOM_VALUE_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Append `name=value` to `url`, percent-encoding the value.
pub(crate) fn append_query(url: &mut String, name: &str, value: &str) {
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(name);
    url.push('=');
    url.push_str(&urlencoding::encode(value));
}

impl RelyingParty {
    /// Build the authorization URL and store the matching request state.
    ///
    /// `options` override the configured `[request]` defaults field by field.
    pub async fn build_authentication_request(
        &self,
        options: &AuthorizeOptions,
    ) -> Result<AuthenticationRequest> {
        let endpoint = match &self.config().provider.authorization_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => self
                .resolve_metadata()
                .await?
                .authorization_endpoint
                .ok_or(Error::MissingAuthorizationEndpoint)?,
        };

        let params = AuthorizeParams::resolve(self.config(), options);
        let (oidc, oauth) = params.flow();

        let request_state = RequestState {
            state: generate_random_value(),
            nonce: oidc.then(generate_random_value),
            oidc,
            oauth,
        };

        let mut url = endpoint;
        append_query(&mut url, "state", &request_state.state);
        if let Some(nonce) = &request_state.nonce {
            append_query(&mut url, "nonce", nonce);
        }
        for (name, value) in params.query_pairs() {
            append_query(&mut url, name, &value);
        }

        let key = &self.config().client.state_key;
        self.store
            .set(key, Some(request_state.to_json()?))
            .await
            .map_err(|e| Error::StateStore(e.to_string()))?;

        info!(
            response_type = %params.response_type,
            oidc,
            oauth,
            "built authentication request"
        );
        Ok(AuthenticationRequest {
            request_state,
            authorization_url: url,
        })
    }
}
