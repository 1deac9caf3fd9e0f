//! Access-token binding via `at_hash`
//!
//! `at_hash = BASE64URL(left half of SHA-256(access_token))`
//!
//! The identity token carries this hash, so an access token swapped in from
//! a different authorization response fails the comparison.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::verify::Claims;

/// Compute the `at_hash` value for an access token.
pub fn compute_at_hash(access_token: &str) -> String {
    let digest = Sha256::digest(access_token.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2])
}

/// Verify that `claims.at_hash` matches `access_token`.
pub fn verify_access_token_binding(claims: &Claims, access_token: &str) -> Result<()> {
    let at_hash = claims
        .get("at_hash")
        .and_then(Value::as_str)
        .ok_or(Error::MissingAtHash)?;

    if compute_at_hash(access_token) != at_hash {
        return Err(Error::AtHashMismatch);
    }
    Ok(())
}
