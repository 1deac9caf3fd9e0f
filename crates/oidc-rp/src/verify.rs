//! Identity-token claim verification
//!
//! Pipeline, each step failing fast:
//! 1. signature against the provider certificate
//! 2. `nonce` equals the nonce sent with the request
//! 3. `iss` equals the discovered issuer
//! 4. `aud` equals our client id
//! 5. `iat` no older than `MAX_TOKEN_AGE_SECS`, `exp` not in the past
//!
//! Only then are the claims handed out, optionally merged with the userinfo
//! endpoint's response.

use oidc_transport::Fetched;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{RelyingParty, unix_now};
use crate::constants::MAX_TOKEN_AGE_SECS;
use crate::error::{Error, Result};

/// Decoded identity-token payload (or profile): claim name to value.
pub type Claims = serde_json::Map<String, Value>;

fn string_claim<'a>(claims: &'a Claims, name: &str) -> Option<&'a str> {
    claims.get(name).and_then(Value::as_str)
}

/// Numeric claim in seconds; fractional values are truncated.
fn time_claim(claims: &Claims, name: &str) -> Option<i64> {
    let value = claims.get(name)?;
    value.as_i64().or_else(|| value.as_f64().map(|v| v as i64))
}

/// Compare the `nonce` claim with the nonce stored for this request.
pub fn check_nonce(claims: &Claims, expected: &str) -> Result<()> {
    match string_claim(claims, "nonce") {
        Some(nonce) if nonce == expected => Ok(()),
        _ => Err(Error::NonceMismatch),
    }
}

/// Issuer, audience, and time-window checks at the instant `now`.
///
/// A missing `iat` or `exp` counts as the epoch, so such tokens fail the
/// age or expiry check rather than slipping through.
pub fn check_registered_claims(
    claims: &Claims,
    issuer: Option<&str>,
    client_id: &str,
    now: i64,
) -> Result<()> {
    let iss = string_claim(claims, "iss");
    if issuer.is_none() || iss != issuer {
        return Err(Error::IssuerMismatch {
            expected: issuer.unwrap_or("<none>").to_string(),
            actual: iss.unwrap_or("<none>").to_string(),
        });
    }

    match claims.get("aud") {
        Some(Value::String(aud)) if aud == client_id => {}
        other => {
            return Err(Error::AudienceMismatch {
                expected: client_id.to_string(),
                actual: other.map_or_else(|| "<none>".to_string(), Value::to_string),
            });
        }
    }

    let iat = time_claim(claims, "iat").unwrap_or(0);
    if now
        .checked_sub(iat)
        .is_none_or(|age| age > MAX_TOKEN_AGE_SECS)
    {
        return Err(Error::TokenTooOld { iat, now });
    }

    let exp = time_claim(claims, "exp").unwrap_or(0);
    if exp < now {
        return Err(Error::TokenExpired { exp, now });
    }

    Ok(())
}

impl RelyingParty {
    /// Verify an identity token and return its claims.
    ///
    /// When `access_token` is given and userinfo loading is enabled, the
    /// userinfo response is merged over the token claims.
    pub async fn verify_identity_token(
        &self,
        id_token: &str,
        nonce: &str,
        access_token: Option<&str>,
    ) -> Result<Claims> {
        let claims = self.validate_identity_token(id_token, nonce).await?;
        match access_token {
            Some(token) if self.config().client.load_user_info => {
                self.merge_user_info(claims, token).await
            }
            _ => Ok(claims),
        }
    }

    /// Signature and claim checks, without userinfo.
    pub(crate) async fn validate_identity_token(
        &self,
        id_token: &str,
        nonce: &str,
    ) -> Result<Claims> {
        let certificate = self.resolve_signing_key().await?;
        let claims = self.verifier.verify(id_token, &certificate)?;

        check_nonce(&claims, nonce)?;

        let metadata = self.resolve_metadata().await?;
        check_registered_claims(
            &claims,
            metadata.issuer.as_deref(),
            &self.config().client.client_id,
            unix_now(),
        )?;

        debug!(sub = ?string_claim(&claims, "sub"), "identity token verified");
        Ok(claims)
    }

    /// Merge userinfo claims over `claims`; userinfo wins on collisions.
    ///
    /// A degraded response (non-JSON body, or JSON that is not an object)
    /// is discarded and the identity-token claims are returned as they are.
    pub(crate) async fn merge_user_info(&self, claims: Claims, access_token: &str) -> Result<Claims> {
        let endpoint = match &self.config().provider.userinfo_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => self
                .resolve_metadata()
                .await?
                .userinfo_endpoint
                .ok_or(Error::MissingUserInfoEndpoint)?,
        };

        let fetched = self
            .fetcher
            .fetch_json(&endpoint, Some(access_token), Some(&self.config().transport))
            .await
            .map_err(|e| Error::UserInfoFetchFailed(e.to_string()))?;

        match fetched {
            Fetched::Json(Value::Object(user_info)) => {
                debug!(claims = user_info.len(), "merged userinfo claims");
                let mut merged = claims;
                merged.extend(user_info);
                Ok(merged)
            }
            Fetched::Json(_) | Fetched::Raw { .. } => {
                warn!(endpoint = %endpoint, "userinfo response is not a claims object, using identity token claims");
                Ok(claims)
            }
        }
    }
}
