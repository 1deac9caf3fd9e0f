//! Provider metadata and signing-key resolution
//!
//! The discovery document and the JWKS are fetched at most once per client
//! and cached for its lifetime. There is no TTL; a provider key rotation
//! requires a new `RelyingParty`. Pre-supplied metadata or keys in the
//! configuration seed the caches, so no request is made for them.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use oidc_transport::Fetched;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::client::RelyingParty;
use crate::constants::DISCOVERY_PATH;
use crate::error::{Error, Result};

/// Discovery document (`.well-known/openid-configuration`), reduced to the
/// fields this client consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
}

/// One entry of the provider's JWKS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonWebKey {
    #[serde(default)]
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// X.509 chain, each entry standard base64 DER, leaf first
    #[serde(default)]
    pub x5c: Vec<String>,
}

/// The provider's JWKS document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SigningKeySet {
    #[serde(default)]
    pub keys: Vec<JsonWebKey>,
}

/// Leaf certificate of the selected signing key, as carried in `x5c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate(String);

impl Certificate {
    pub fn new(base64_der: impl Into<String>) -> Self {
        Self(base64_der.into())
    }

    /// Decode to DER bytes.
    pub fn to_der(&self) -> std::result::Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.0.trim())
    }
}

impl SigningKeySet {
    /// Select the signing certificate.
    ///
    /// Only the first key in the set is considered: it must be RSA and carry
    /// at least one certificate. A qualifying key further down the list is
    /// not searched for.
    pub fn signing_certificate(&self) -> Result<Certificate> {
        let key = self.keys.first().ok_or(Error::NoSigningKeys)?;
        if key.kty != "RSA" {
            return Err(Error::UnsupportedKeyType(key.kty.clone()));
        }
        let certificate = key.x5c.first().ok_or(Error::EmptyCertificateChain)?;
        Ok(Certificate::new(certificate.clone()))
    }
}

/// Discovery URL for an authority, without doubling the well-known suffix.
pub fn discovery_url(authority: &str) -> String {
    if authority.ends_with(DISCOVERY_PATH) {
        return authority.to_string();
    }
    format!("{}{}", authority.trim_end_matches('/'), DISCOVERY_PATH)
}

/// Unwrap a JSON fetch result; degraded (non-JSON) bodies are failures here.
fn require_json(fetched: Fetched, url: &str) -> std::result::Result<Value, String> {
    match fetched {
        Fetched::Json(value) => Ok(value),
        Fetched::Raw { status, .. } => Err(format!("{url} returned a non-JSON body ({status})")),
    }
}

impl RelyingParty {
    /// Resolve the provider's discovery document.
    ///
    /// Returns the cached (or pre-supplied) document when present; otherwise
    /// fetches it from `metadata_url` or the authority's well-known path.
    pub async fn resolve_metadata(&self) -> Result<ProviderMetadata> {
        if let Some(metadata) = self.metadata.read().await.as_ref() {
            return Ok(metadata.clone());
        }

        let provider = &self.config().provider;
        let url = match (&provider.metadata_url, &provider.authority) {
            (Some(url), _) => url.clone(),
            (None, Some(authority)) => discovery_url(authority),
            (None, None) => {
                return Err(Error::MissingConfiguration(
                    "provider.authority or provider.metadata_url is required".into(),
                ));
            }
        };

        debug!(url = %url, "fetching provider metadata");
        let fetched = self
            .fetcher
            .fetch_json(&url, None, Some(&self.config().transport))
            .await
            .map_err(|e| Error::MetadataFetchFailed(e.to_string()))?;
        let document = require_json(fetched, &url).map_err(Error::MetadataFetchFailed)?;
        let metadata: ProviderMetadata = serde_json::from_value(document)
            .map_err(|e| Error::MetadataFetchFailed(format!("invalid discovery document: {e}")))?;

        info!(url = %url, issuer = ?metadata.issuer, "loaded provider metadata");
        *self.metadata.write().await = Some(metadata.clone());
        Ok(metadata)
    }

    /// Resolve the certificate identity tokens must be signed with.
    pub async fn resolve_signing_key(&self) -> Result<Certificate> {
        if let Some(keys) = self.signing_keys.read().await.as_ref() {
            return keys.signing_certificate();
        }

        let metadata = self.resolve_metadata().await?;
        let url = metadata.jwks_uri.ok_or(Error::MissingJwksUri)?;

        debug!(url = %url, "fetching signing keys");
        let fetched = self
            .fetcher
            .fetch_json(&url, None, Some(&self.config().transport))
            .await
            .map_err(|e| Error::KeyFetchFailed(e.to_string()))?;
        let document = require_json(fetched, &url).map_err(Error::KeyFetchFailed)?;
        let keys: SigningKeySet = serde_json::from_value(document)
            .map_err(|e| Error::KeyFetchFailed(format!("invalid JWKS document: {e}")))?;

        info!(url = %url, keys = keys.keys.len(), "loaded signing keys");
        let certificate = keys.signing_certificate();
        *self.signing_keys.write().await = Some(keys);
        certificate
    }
}
