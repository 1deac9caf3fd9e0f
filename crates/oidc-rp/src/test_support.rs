//! Shared fixtures for unit tests: a scripted fetcher, a provider whose
//! signing certificate lives in `tests/fixtures`, and token signing helpers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use oidc_transport::{BoxFuture, FetchOptions, Fetched, JsonFetcher, MemoryStateStore};
use serde_json::{Value, json};

use crate::client::{RelyingParty, unix_now};
use crate::config::ClientConfig;
use crate::metadata::Certificate;

pub const CLIENT_ID: &str = "webapp";
pub const ISSUER: &str = "https://idp.example.com";
pub const REDIRECT_URI: &str = "https://app.example.com/callback";

pub fn signing_key_pem() -> &'static str {
    include_str!("../tests/fixtures/signing_key.pem")
}

pub fn untrusted_key_pem() -> &'static str {
    include_str!("../tests/fixtures/untrusted_key.pem")
}

/// Base64 DER body of the fixture certificate, as it would appear in `x5c`.
pub fn fixture_certificate_base64() -> String {
    include_str!("../tests/fixtures/signing_cert.pem")
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect()
}

pub fn fixture_certificate() -> Certificate {
    Certificate::new(fixture_certificate_base64())
}

pub fn sign_with(key_pem: &str, alg: Algorithm, claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(key_pem.as_bytes()).unwrap();
    jsonwebtoken::encode(&Header::new(alg), claims, &key).unwrap()
}

/// Sign with the provider's fixture key (RS256).
pub fn sign_claims(claims: &Value) -> String {
    sign_with(signing_key_pem(), Algorithm::RS256, claims)
}

/// Fresh, valid identity-token claims for `CLIENT_ID` from `ISSUER`.
pub fn id_token_claims(nonce: &str, at_hash: Option<&str>) -> Value {
    let now = unix_now();
    let mut claims = json!({
        "iss": ISSUER,
        "aud": CLIENT_ID,
        "sub": "alice",
        "name": "Alice",
        "iat": now,
        "exp": now + 600,
        "nbf": now,
        "idp": "local",
        "nonce": nonce,
    });
    if let Some(at_hash) = at_hash {
        claims["at_hash"] = json!(at_hash);
    }
    claims
}

pub fn discovery_document() -> Value {
    json!({
        "issuer": ISSUER,
        "authorization_endpoint": "https://idp.example.com/authorize",
        "token_endpoint": "https://idp.example.com/token",
        "userinfo_endpoint": "https://idp.example.com/userinfo",
        "end_session_endpoint": "https://idp.example.com/logout",
        "jwks_uri": "https://idp.example.com/jwks",
    })
}

pub fn jwks_document() -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "kid": "fixture",
            "x5c": [fixture_certificate_base64()],
        }]
    })
}

#[derive(Default)]
struct Routes {
    responses: Mutex<HashMap<String, Fetched>>,
    bearers: Mutex<HashMap<String, Option<String>>>,
    calls: AtomicUsize,
}

/// `JsonFetcher` answering from a fixed URL table. Unknown URLs fail with a
/// transport error.
#[derive(Clone, Default)]
pub struct StaticFetcher {
    routes: Arc<Routes>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(self, url: &str, body: Value) -> Self {
        self.route(url, Fetched::Json(body))
    }

    pub fn with_raw(self, url: &str, body: &str) -> Self {
        self.route(
            url,
            Fetched::Raw {
                status: 200,
                body: body.to_string(),
            },
        )
    }

    fn route(self, url: &str, fetched: Fetched) -> Self {
        self.routes
            .responses
            .lock()
            .unwrap()
            .insert(url.to_string(), fetched);
        self
    }

    /// Number of fetches made so far.
    pub fn calls(&self) -> usize {
        self.routes.calls.load(Ordering::SeqCst)
    }

    /// Bearer token presented on the last fetch of `url`, if any.
    pub fn bearer_for(&self, url: &str) -> Option<String> {
        self.routes.bearers.lock().unwrap().get(url).cloned().flatten()
    }
}

impl JsonFetcher for StaticFetcher {
    fn fetch_json<'a>(
        &'a self,
        url: &'a str,
        bearer_token: Option<&'a str>,
        _options: Option<&'a FetchOptions>,
    ) -> BoxFuture<'a, oidc_transport::Result<Fetched>> {
        self.routes.calls.fetch_add(1, Ordering::SeqCst);
        self.routes
            .bearers
            .lock()
            .unwrap()
            .insert(url.to_string(), bearer_token.map(str::to_string));
        let response = self.routes.responses.lock().unwrap().get(url).cloned();
        Box::pin(async move {
            response.ok_or_else(|| oidc_transport::Error::Http(format!("no route for {url}")))
        })
    }
}

/// Fetcher serving the fixture provider's discovery document and JWKS.
pub fn hybrid_fetcher() -> StaticFetcher {
    StaticFetcher::new()
        .with_json(
            "https://idp.example.com/.well-known/openid-configuration",
            discovery_document(),
        )
        .with_json("https://idp.example.com/jwks", jwks_document())
}

pub fn client_with(
    config: ClientConfig,
    fetcher: StaticFetcher,
) -> (RelyingParty, Arc<MemoryStateStore>) {
    let store = Arc::new(MemoryStateStore::new());
    let client = RelyingParty::new(config, Arc::new(fetcher), store.clone());
    (client, store)
}

impl ClientConfig {
    /// `CLIENT_ID` at `ISSUER`, hybrid response type, all defaults.
    pub fn test_default() -> Self {
        ClientConfig::new(CLIENT_ID, REDIRECT_URI).with_authority(ISSUER)
    }
}
