//! End-to-end sign-in through the public API: build the authorization URL,
//! fabricate the provider's redirect, and process it with real signature
//! verification against the fixture certificate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use oidc_rp::{
    AuthorizeOptions, CallbackResult, ClientConfig, Error, ErrorKind, RelyingParty,
    compute_at_hash,
};
use oidc_transport::{BoxFuture, FetchOptions, Fetched, JsonFetcher, MemoryStateStore};
use serde_json::{Value, json};

const ISSUER: &str = "https://idp.example.com";
const DISCOVERY: &str = "https://idp.example.com/.well-known/openid-configuration";
const JWKS: &str = "https://idp.example.com/jwks";
const USERINFO: &str = "https://idp.example.com/userinfo";
const CALLBACK: &str = "https://app.example.com/callback";

/// Provider double serving fixed documents by URL.
#[derive(Default)]
struct Provider {
    documents: Mutex<HashMap<String, Value>>,
}

impl Provider {
    fn standard() -> Self {
        Self::with_keys(json!({
            "keys": [{"kty": "RSA", "use": "sig", "x5c": [certificate()]}]
        }))
    }

    fn with_keys(keys: Value) -> Self {
        let provider = Self::default();
        {
            let mut documents = provider.documents.lock().unwrap();
            documents.insert(
                DISCOVERY.into(),
                json!({
                    "issuer": ISSUER,
                    "authorization_endpoint": "https://idp.example.com/authorize",
                    "userinfo_endpoint": USERINFO,
                    "jwks_uri": JWKS,
                }),
            );
            documents.insert(JWKS.into(), keys);
            documents.insert(USERINFO.into(), json!({"email": "alice@example.com"}));
        }
        provider
    }
}

impl JsonFetcher for Provider {
    fn fetch_json<'a>(
        &'a self,
        url: &'a str,
        _bearer_token: Option<&'a str>,
        _options: Option<&'a FetchOptions>,
    ) -> BoxFuture<'a, oidc_transport::Result<Fetched>> {
        let document = self.documents.lock().unwrap().get(url).cloned();
        Box::pin(async move {
            document
                .map(Fetched::Json)
                .ok_or_else(|| oidc_transport::Error::Http(format!("unexpected fetch: {url}")))
        })
    }
}

fn certificate() -> String {
    include_str!("fixtures/signing_cert.pem")
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect()
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn sign(claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(include_bytes!("fixtures/signing_key.pem")).unwrap();
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &key).unwrap()
}

fn client(provider: Provider) -> (RelyingParty, Arc<MemoryStateStore>) {
    let config = ClientConfig::new("webapp", CALLBACK).with_authority(ISSUER);
    let store = Arc::new(MemoryStateStore::new());
    let client = RelyingParty::new(config, Arc::new(provider), store.clone());
    (client, store)
}

/// Query parameter `name` of the authorization URL.
fn param(url: &str, name: &str) -> String {
    url::Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .unwrap()
}

/// The redirect a well-behaved provider would send for `authorization_url`.
fn provider_redirect(authorization_url: &str, access_token: &str) -> String {
    let iat = now();
    let id_token = sign(&json!({
        "iss": ISSUER,
        "aud": "webapp",
        "sub": "alice",
        "name": "Alice",
        "iat": iat,
        "exp": iat + 600,
        "nbf": iat,
        "idp": "local",
        "nonce": param(authorization_url, "nonce"),
        "at_hash": compute_at_hash(access_token),
    }));
    format!(
        "{CALLBACK}#state={}&id_token={id_token}&access_token={access_token}&token_type=Bearer&expires_in=3600&scope=openid",
        param(authorization_url, "state"),
    )
}

#[tokio::test]
async fn hybrid_sign_in_yields_clean_profile() {
    let (client, _store) = client(Provider::standard());

    let request = client
        .build_authentication_request(&AuthorizeOptions::default())
        .await
        .unwrap();
    let redirect = provider_redirect(&request.authorization_url, "at_abc");

    let session = client
        .process_response(Some(CallbackResult::from_url(&redirect)), None)
        .await
        .unwrap();

    let profile = session.profile.unwrap();
    assert_eq!(profile["sub"], "alice");
    assert_eq!(profile["email"], "alice@example.com");
    for claim in ["nonce", "at_hash", "iat", "nbf", "exp", "aud", "iss", "idp"] {
        assert!(!profile.contains_key(claim), "{claim} leaked into profile");
    }
    assert_eq!(session.access_token.unwrap().expose(), "at_abc");
    assert_eq!(session.token_type.as_deref(), Some("Bearer"));
}

#[tokio::test]
async fn request_state_is_single_use() {
    let (client, _store) = client(Provider::standard());

    let request = client
        .build_authentication_request(&AuthorizeOptions::default())
        .await
        .unwrap();
    let redirect = provider_redirect(&request.authorization_url, "at_abc");

    client
        .process_response(Some(CallbackResult::from_url(&redirect)), None)
        .await
        .unwrap();

    let replay = client
        .process_response(Some(CallbackResult::from_url(&redirect)), None)
        .await;
    assert!(matches!(replay, Err(Error::MissingRequestState)));
}

#[tokio::test]
async fn response_for_another_request_is_rejected() {
    let (client, _store) = client(Provider::standard());

    let first = client
        .build_authentication_request(&AuthorizeOptions::default())
        .await
        .unwrap();
    // A second attempt overwrites the stored state
    client
        .build_authentication_request(&AuthorizeOptions::default())
        .await
        .unwrap();

    let redirect = provider_redirect(&first.authorization_url, "at_abc");
    let err = client
        .process_response(Some(CallbackResult::from_url(&redirect)), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StateMismatch));
    assert_eq!(err.kind(), ErrorKind::Protocol);
}

#[tokio::test]
async fn substituted_access_token_is_rejected() {
    let (client, _store) = client(Provider::standard());

    let request = client
        .build_authentication_request(&AuthorizeOptions::default())
        .await
        .unwrap();
    let redirect = provider_redirect(&request.authorization_url, "at_abc")
        .replace("access_token=at_abc", "access_token=at_abd");

    let err = client
        .process_response(Some(CallbackResult::from_url(&redirect)), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AtHashMismatch));
    assert_eq!(err.kind(), ErrorKind::Cryptographic);
}

#[tokio::test]
async fn only_the_first_signing_key_is_considered() {
    let (client, _store) = client(Provider::with_keys(json!({
        "keys": [
            {"kty": "EC", "x5c": [certificate()]},
            {"kty": "RSA", "x5c": [certificate()]}
        ]
    })));

    let request = client
        .build_authentication_request(&AuthorizeOptions::default())
        .await
        .unwrap();
    let redirect = provider_redirect(&request.authorization_url, "at_abc");

    let err = client
        .process_response(Some(CallbackResult::from_url(&redirect)), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedKeyType(ref kty) if kty == "EC"));
    assert_eq!(err.kind(), ErrorKind::KeyMaterial);
}

#[tokio::test]
async fn provider_error_is_surfaced_with_description() {
    let (client, _store) = client(Provider::standard());

    let request = client
        .build_authentication_request(&AuthorizeOptions::default())
        .await
        .unwrap();
    let redirect = format!(
        "{CALLBACK}#error=access_denied&error_description=User%20cancelled&state={}",
        request.request_state.state
    );

    match client
        .process_response(Some(CallbackResult::from_url(&redirect)), None)
        .await
    {
        Err(Error::ProviderError(message)) => assert_eq!(message, "access_denied: User cancelled"),
        other => panic!("expected ProviderError, got {other:?}"),
    }
}
