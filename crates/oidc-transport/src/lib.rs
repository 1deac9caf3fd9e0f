//! Collaborator seams for the OIDC relying party
//!
//! The relying party never talks to the network or to a session backend
//! directly. It depends on two traits defined here:
//! - `JsonFetcher` performs a GET and hands back the parsed JSON body
//! - `StateStore` persists the per-attempt request state between the
//!   outbound redirect and the callback
//!
//! Default implementations ship alongside: `HttpFetcher` (reqwest),
//! `MemoryStateStore`, and `FileStateStore`. Both traits use
//! `Pin<Box<dyn Future>>` returns so they stay dyn-compatible
//! (`Arc<dyn JsonFetcher>`, `Arc<dyn StateStore>`).

pub mod file;
pub mod http;
pub mod memory;

pub use file::FileStateStore;
pub use http::HttpFetcher;
pub use memory::MemoryStateStore;

use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed, sendable future returned by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors from transport and state-store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("state store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a successful fetch.
///
/// A 2xx response whose body is not JSON is handed back as `Raw` instead of
/// failing. Callers decide whether a degraded response is acceptable: the
/// discovery and key-set lookups reject it, the userinfo lookup falls back to
/// identity-token claims.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Json(serde_json::Value),
    Raw { status: u16, body: String },
}

/// Per-request transport policy.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchOptions {
    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FetchOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Fetch a JSON document, optionally presenting a bearer token.
pub trait JsonFetcher: Send + Sync {
    fn fetch_json<'a>(
        &'a self,
        url: &'a str,
        bearer_token: Option<&'a str>,
        options: Option<&'a FetchOptions>,
    ) -> BoxFuture<'a, Result<Fetched>>;
}

/// Request-scoped key/value store for serialized request state.
///
/// `set` with `None` clears the entry. `take` must read and remove in one
/// step so a stored request state can be consumed at most once; the default
/// implementation composes `get` and `clear` and is only suitable for
/// stores that never see concurrent callbacks for the same key.
pub trait StateStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>>;

    fn set<'a>(&'a self, key: &'a str, value: Option<String>) -> BoxFuture<'a, Result<()>>;

    fn clear<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
        self.set(key, None)
    }

    fn take<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let value = self.get(key).await?;
            if value.is_some() {
                self.clear(key).await?;
            }
            Ok(value)
        })
    }
}
