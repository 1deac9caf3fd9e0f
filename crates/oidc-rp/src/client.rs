//! The relying-party client
//!
//! `RelyingParty` owns the configuration, the injected collaborators, and
//! the metadata/key caches. Its operations are implemented next to the data
//! they work on:
//! - `metadata.rs`: `resolve_metadata`, `resolve_signing_key`
//! - `request.rs`: `build_authentication_request`
//! - `response.rs`: `process_response`
//! - `verify.rs`: `verify_identity_token`
//! - `signout.rs`: `build_sign_out_request`

use std::sync::Arc;

use oidc_transport::{JsonFetcher, StateStore};
use tokio::sync::RwLock;

use crate::binding;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::metadata::{ProviderMetadata, SigningKeySet};
use crate::signature::{SignatureVerifier, X509SignatureVerifier};
use crate::verify::Claims;

pub struct RelyingParty {
    config: ClientConfig,
    pub(crate) fetcher: Arc<dyn JsonFetcher>,
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) verifier: Arc<dyn SignatureVerifier>,
    pub(crate) metadata: RwLock<Option<ProviderMetadata>>,
    pub(crate) signing_keys: RwLock<Option<SigningKeySet>>,
}

impl RelyingParty {
    /// Create a client verifying signatures against the provider's x5c certificate.
    ///
    /// Metadata and keys present in `config.provider` pre-seed the caches.
    pub fn new(
        config: ClientConfig,
        fetcher: Arc<dyn JsonFetcher>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let metadata = RwLock::new(config.provider.metadata.clone());
        let signing_keys = RwLock::new(config.provider.signing_keys.clone());
        Self {
            config,
            fetcher,
            store,
            verifier: Arc::new(X509SignatureVerifier),
            metadata,
            signing_keys,
        }
    }

    /// Replace the signature verification capability.
    pub fn with_signature_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Check that `access_token` is the one `claims.at_hash` vouches for.
    pub fn verify_access_token_binding(&self, claims: &Claims, access_token: &str) -> Result<()> {
        binding::verify_access_token_binding(claims, access_token)
    }
}

/// Current Unix time in seconds.
pub(crate) fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
