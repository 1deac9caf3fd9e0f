//! Protocol constants
//!
//! Values fixed by OpenID Connect Core / Discovery, plus the defaults this
//! client applies when the configuration leaves them out.

/// Path appended to the authority to locate the discovery document.
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Default key under which request state is stored between redirect and callback.
pub const DEFAULT_STATE_KEY: &str = "oidc.request_state";

/// Default response type: identity token plus access token (hybrid implicit).
pub const DEFAULT_RESPONSE_TYPE: &str = "id_token token";

/// Default scope; `openid` is mandatory for identity tokens.
pub const DEFAULT_SCOPE: &str = "openid";

/// Maximum accepted age of an identity token's `iat`, in seconds.
pub const MAX_TOKEN_AGE_SECS: i64 = 300;

/// Random bytes behind each `state` and `nonce` value (43 base64url chars).
pub const RANDOM_VALUE_BYTES: usize = 32;

/// Token type the provider must report for implicit access tokens.
pub const BEARER_TOKEN_TYPE: &str = "bearer";

/// Claims describing the token itself rather than the user. Stripped from
/// the delivered profile when claim filtering is enabled.
pub const PROTOCOL_CLAIMS: [&str; 8] = [
    "nonce", "at_hash", "iat", "nbf", "exp", "aud", "iss", "idp",
];
