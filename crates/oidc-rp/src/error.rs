//! Error types for relying-party operations
//!
//! Every failure is a named variant. Steps propagate errors unchanged with
//! `?`; the web layer calling into this crate decides what the user sees.

/// Broad family of a failure, for callers that map errors to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    KeyMaterial,
    Protocol,
    TokenShape,
    Cryptographic,
}

/// Errors from relying-party operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Configuration
    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("no authorization endpoint configured or discovered")]
    MissingAuthorizationEndpoint,

    #[error("provider metadata has no jwks_uri")]
    MissingJwksUri,

    #[error("no userinfo endpoint configured or discovered")]
    MissingUserInfoEndpoint,

    #[error("provider metadata has no end_session_endpoint")]
    MissingEndSessionEndpoint,

    // Transport
    #[error("metadata fetch failed: {0}")]
    MetadataFetchFailed(String),

    #[error("signing key fetch failed: {0}")]
    KeyFetchFailed(String),

    #[error("userinfo fetch failed: {0}")]
    UserInfoFetchFailed(String),

    // Key material
    #[error("signing key set is empty")]
    NoSigningKeys,

    #[error("unsupported signing key type: {0}")]
    UnsupportedKeyType(String),

    #[error("signing key has no certificate chain")]
    EmptyCertificateChain,

    // Protocol / session
    #[error("no request state found for this response")]
    MissingRequestState,

    #[error("request state has no state value")]
    MissingState,

    #[error("no response received from the provider")]
    NoResponse,

    #[error("provider returned an error: {0}")]
    ProviderError(String),

    #[error("response state does not match request state")]
    StateMismatch,

    #[error("request state store failed: {0}")]
    StateStore(String),

    // Token shape
    #[error("response has no id_token")]
    MissingIdentityToken,

    #[error("request state has no nonce")]
    MissingNonce,

    #[error("response has no access_token")]
    MissingAccessToken,

    #[error("invalid token_type: {0}")]
    InvalidTokenType(String),

    #[error("response has no expires_in")]
    MissingExpiry,

    // Cryptographic / claims
    #[error("identity token signature invalid: {0}")]
    SignatureInvalid(String),

    #[error("identity token nonce does not match")]
    NonceMismatch,

    #[error("identity token issuer mismatch: expected {expected}, got {actual}")]
    IssuerMismatch { expected: String, actual: String },

    #[error("identity token audience mismatch: expected {expected}, got {actual}")]
    AudienceMismatch { expected: String, actual: String },

    #[error("identity token issued too long ago (iat {iat}, now {now})")]
    TokenTooOld { iat: i64, now: i64 },

    #[error("identity token expired (exp {exp}, now {now})")]
    TokenExpired { exp: i64, now: i64 },

    #[error("identity token has no at_hash claim")]
    MissingAtHash,

    #[error("access token does not match at_hash")]
    AtHashMismatch,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingConfiguration(_)
            | Error::MissingAuthorizationEndpoint
            | Error::MissingJwksUri
            | Error::MissingUserInfoEndpoint
            | Error::MissingEndSessionEndpoint => ErrorKind::Configuration,

            Error::MetadataFetchFailed(_)
            | Error::KeyFetchFailed(_)
            | Error::UserInfoFetchFailed(_) => ErrorKind::Transport,

            Error::NoSigningKeys | Error::UnsupportedKeyType(_) | Error::EmptyCertificateChain => {
                ErrorKind::KeyMaterial
            }

            Error::MissingRequestState
            | Error::MissingState
            | Error::NoResponse
            | Error::ProviderError(_)
            | Error::StateMismatch
            | Error::StateStore(_) => ErrorKind::Protocol,

            Error::MissingIdentityToken
            | Error::MissingNonce
            | Error::MissingAccessToken
            | Error::InvalidTokenType(_)
            | Error::MissingExpiry => ErrorKind::TokenShape,

            Error::SignatureInvalid(_)
            | Error::NonceMismatch
            | Error::IssuerMismatch { .. }
            | Error::AudienceMismatch { .. }
            | Error::TokenTooOld { .. }
            | Error::TokenExpired { .. }
            | Error::MissingAtHash
            | Error::AtHashMismatch => ErrorKind::Cryptographic,
        }
    }
}

/// Result alias for relying-party operations.
pub type Result<T> = std::result::Result<T, Error>;
