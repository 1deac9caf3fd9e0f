//! Authorization response processing
//!
//! `process_response` is the callback half of the flow. It consumes the
//! stored request state, checks the response against it, verifies whatever
//! tokens the flow asked for, and hands back a `NormalizedSession`.

use common::Secret;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::binding::verify_access_token_binding;
use crate::client::RelyingParty;
use crate::constants::{BEARER_TOKEN_TYPE, PROTOCOL_CLAIMS};
use crate::error::{Error, Result};
use crate::request::RequestState;
use crate::verify::Claims;

/// Parameters the provider sent back on the redirect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackResult {
    pub state: String,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub id_token: Option<Secret<String>>,
    pub access_token: Option<Secret<String>>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
    pub session_state: Option<String>,
}

impl CallbackResult {
    /// Parse a redirect URL.
    ///
    /// Implicit responses arrive in the fragment; `response_mode=query`
    /// responses in the query string. A bare `a=b&c=d` string is accepted
    /// as well. Unknown parameters are ignored.
    pub fn from_url(url: &str) -> Self {
        let params = match (url.split_once('#'), url.split_once('?')) {
            (Some((_, fragment)), _) => fragment,
            (None, Some((_, query))) => query,
            (None, None) => url,
        };

        let mut result = Self::default();
        for (name, value) in url::form_urlencoded::parse(params.as_bytes()) {
            let value = value.into_owned();
            match name.as_ref() {
                "state" => result.state = value,
                "error" => result.error = Some(value),
                "error_description" => result.error_description = Some(value),
                "id_token" => result.id_token = Some(Secret::new(value)),
                "access_token" => result.access_token = Some(Secret::new(value)),
                "token_type" => result.token_type = Some(value),
                "expires_in" => result.expires_in = value.parse().ok(),
                "scope" => result.scope = Some(value),
                "session_state" => result.session_state = Some(value),
                _ => {}
            }
        }
        result
    }
}

/// Outcome of a successful sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSession {
    /// Verified user claims; `None` for access-token-only flows
    pub profile: Option<Claims>,
    pub id_token: Option<Secret<String>>,
    pub access_token: Option<Secret<String>>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
    pub session_state: Option<String>,
}

/// Remove claims that describe the token rather than the user.
pub fn filter_protocol_claims(mut claims: Claims) -> Claims {
    for name in PROTOCOL_CLAIMS {
        claims.remove(name);
    }
    claims
}

impl RelyingParty {
    /// Validate a provider callback and produce the session.
    ///
    /// `request_state` is normally `None`, in which case the stored state is
    /// taken (and thereby consumed) from the state store. A state passed in
    /// explicitly leaves the store untouched.
    pub async fn process_response(
        &self,
        result: Option<CallbackResult>,
        request_state: Option<RequestState>,
    ) -> Result<NormalizedSession> {
        let request_state = match request_state {
            Some(state) => state,
            None => self.take_request_state().await?,
        };

        if request_state.state.is_empty() {
            return Err(Error::MissingState);
        }

        let result = result.ok_or(Error::NoResponse)?;
        if let Some(error) = &result.error {
            let message = match &result.error_description {
                Some(description) => format!("{error}: {description}"),
                None => error.clone(),
            };
            warn!(error = %error, "provider returned an error response");
            return Err(Error::ProviderError(message));
        }

        if result.state != request_state.state {
            warn!("response state does not match request state");
            return Err(Error::StateMismatch);
        }

        let mut nonce = None;
        if request_state.oidc {
            if result.id_token.is_none() {
                return Err(Error::MissingIdentityToken);
            }
            nonce = Some(request_state.nonce.as_deref().ok_or(Error::MissingNonce)?);
        }

        if request_state.oauth {
            if result.access_token.is_none() {
                return Err(Error::MissingAccessToken);
            }
            match result.token_type.as_deref() {
                Some(token_type) if token_type.eq_ignore_ascii_case(BEARER_TOKEN_TYPE) => {}
                other => {
                    return Err(Error::InvalidTokenType(
                        other.unwrap_or("<none>").to_string(),
                    ));
                }
            }
            if result.expires_in.is_none() {
                return Err(Error::MissingExpiry);
            }
        }

        let id_token = result.id_token.as_ref().map(|t| t.expose().as_str());
        let access_token = result.access_token.as_ref().map(|t| t.expose().as_str());

        let profile = match (id_token, nonce, access_token) {
            (Some(id_token), Some(nonce), Some(access_token)) if request_state.oauth => {
                let claims = self.validate_identity_token(id_token, nonce).await?;
                verify_access_token_binding(&claims, access_token)?;
                let claims = if self.config().client.load_user_info {
                    self.merge_user_info(claims, access_token).await?
                } else {
                    claims
                };
                Some(claims)
            }
            (Some(id_token), Some(nonce), _) => {
                Some(self.verify_identity_token(id_token, nonce, None).await?)
            }
            _ => None,
        };

        let profile = if self.config().client.filter_protocol_claims {
            profile.map(filter_protocol_claims)
        } else {
            profile
        };

        let sub = profile
            .as_ref()
            .and_then(|p| p.get("sub"))
            .and_then(Value::as_str);
        info!(
            oidc = request_state.oidc,
            oauth = request_state.oauth,
            sub = ?sub,
            "authorization response accepted"
        );

        Ok(NormalizedSession {
            profile,
            id_token: result.id_token,
            access_token: result.access_token,
            token_type: result.token_type,
            expires_in: result.expires_in,
            scope: result.scope,
            session_state: result.session_state,
        })
    }

    /// Consume the stored request state. Absent or unparsable records are
    /// both `MissingRequestState`.
    async fn take_request_state(&self) -> Result<RequestState> {
        let key = &self.config().client.state_key;
        let raw = self
            .store
            .take(key)
            .await
            .map_err(|e| Error::StateStore(e.to_string()))?
            .ok_or(Error::MissingRequestState)?;

        match RequestState::from_json(&raw) {
            Some(state) => Ok(state),
            None => {
                debug!(key = %key, "stored request state is not parsable");
                Err(Error::MissingRequestState)
            }
        }
    }
}
