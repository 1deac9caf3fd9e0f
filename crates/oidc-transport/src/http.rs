//! reqwest-backed `JsonFetcher`
//!
//! Used for the discovery document, the JWKS document, and the userinfo
//! endpoint. Non-2xx statuses are errors; a 2xx body that does not parse as
//! JSON comes back as `Fetched::Raw` so the caller can decide what a degraded
//! response means.

use reqwest::header::ACCEPT;
use tracing::{debug, warn};

use crate::{BoxFuture, Error, FetchOptions, Fetched, JsonFetcher, Result};

/// JSON-over-HTTP fetcher with a default transport policy.
///
/// Per-call `FetchOptions` override the defaults given at construction.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    defaults: FetchOptions,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, defaults: FetchOptions) -> Self {
        Self { client, defaults }
    }

    async fn get(
        &self,
        url: &str,
        bearer_token: Option<&str>,
        options: &FetchOptions,
    ) -> Result<Fetched> {
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .timeout(options.timeout());
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("reading body from {url} failed: {e}")))?;

        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        match serde_json::from_str(&body) {
            Ok(value) => {
                debug!(url, status = status.as_u16(), "fetched JSON document");
                Ok(Fetched::Json(value))
            }
            Err(e) => {
                warn!(url, status = status.as_u16(), error = %e, "response body is not JSON");
                Ok(Fetched::Raw {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new(), FetchOptions::default())
    }
}

impl JsonFetcher for HttpFetcher {
    fn fetch_json<'a>(
        &'a self,
        url: &'a str,
        bearer_token: Option<&'a str>,
        options: Option<&'a FetchOptions>,
    ) -> BoxFuture<'a, Result<Fetched>> {
        let options = options.unwrap_or(&self.defaults);
        Box::pin(self.get(url, bearer_token, options))
    }
}
