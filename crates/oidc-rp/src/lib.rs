//! OpenID Connect relying party for the implicit and hybrid flows
//!
//! Builds authorization requests, validates the provider's redirect
//! response, and turns it into a verified `NormalizedSession`. Network
//! access and request-state persistence are injected through the
//! `oidc_transport` traits; the crate itself never opens a connection.
//!
//! Sign-in flow:
//! 1. `RelyingParty::build_authentication_request()` stores a `RequestState`
//!    and returns the authorization URL to redirect the user to
//! 2. The provider redirects back; `CallbackResult::from_url()` parses it
//! 3. `RelyingParty::process_response()` consumes the stored state, checks
//!    the response, verifies the identity token (signature, nonce, issuer,
//!    audience, age, expiry) and the `at_hash` binding of the access token
//! 4. The verified profile is optionally merged with userinfo claims and
//!    stripped of protocol claims
//!
//! Sign-out: `RelyingParty::build_sign_out_request()`.

pub mod binding;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod metadata;
pub mod request;
pub mod response;
pub mod signature;
pub mod signout;
pub mod verify;

#[cfg(test)]
mod test_support;

pub use binding::{compute_at_hash, verify_access_token_binding};
pub use client::RelyingParty;
pub use config::{AuthorizeOptions, ClientConfig};
pub use error::{Error, ErrorKind, Result};
pub use metadata::{Certificate, ProviderMetadata, SigningKeySet};
pub use request::{AuthenticationRequest, RequestState};
pub use response::{CallbackResult, NormalizedSession};
pub use signature::{SignatureVerifier, X509SignatureVerifier};
pub use signout::SignOutRequest;
pub use verify::Claims;
