//! RP-initiated logout (front channel)

use tracing::info;

use crate::client::RelyingParty;
use crate::error::{Error, Result};
use crate::request::{append_query, generate_random_value};

/// Provider logout URL plus the `state` it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOutRequest {
    pub state: String,
    pub url: String,
}

impl RelyingParty {
    /// Build the `end_session_endpoint` redirect.
    ///
    /// Falls back to the configured `post_logout_redirect_uri` when none is
    /// supplied. Empty values are omitted like in authorization requests.
    pub async fn build_sign_out_request(
        &self,
        id_token_hint: Option<&str>,
        post_logout_redirect_uri: Option<&str>,
    ) -> Result<SignOutRequest> {
        let metadata = self.resolve_metadata().await?;
        let mut url = metadata
            .end_session_endpoint
            .ok_or(Error::MissingEndSessionEndpoint)?;

        let state = generate_random_value();
        let redirect = post_logout_redirect_uri
            .or(self.config().client.post_logout_redirect_uri.as_deref());

        append_query(&mut url, "state", &state);
        for (name, value) in [
            ("id_token_hint", id_token_hint),
            ("post_logout_redirect_uri", redirect),
        ] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                append_query(&mut url, name, value);
            }
        }

        info!(hinted = id_token_hint.is_some(), "built sign-out request");
        Ok(SignOutRequest { state, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::test_support::{StaticFetcher, client_with, discovery_document, hybrid_fetcher};

    #[tokio::test]
    async fn url_carries_state_hint_and_redirect() {
        let (client, _store) = client_with(ClientConfig::test_default(), hybrid_fetcher());

        let request = client
            .build_sign_out_request(Some("h.p.s"), Some("https://app.example.com/bye"))
            .await
            .unwrap();

        assert_eq!(
            request.url,
            format!(
                "https://idp.example.com/logout?state={}&id_token_hint=h.p.s&post_logout_redirect_uri=https%3A%2F%2Fapp.example.com%2Fbye",
                request.state
            )
        );
    }

    #[tokio::test]
    async fn configured_redirect_is_the_fallback() {
        let mut config = ClientConfig::test_default();
        config.client.post_logout_redirect_uri = Some("https://app.example.com/".into());
        let (client, _store) = client_with(config, hybrid_fetcher());

        let request = client.build_sign_out_request(None, None).await.unwrap();
        assert!(!request.url.contains("id_token_hint"));
        assert!(
            request
                .url
                .ends_with("&post_logout_redirect_uri=https%3A%2F%2Fapp.example.com%2F")
        );

        let request = client.build_sign_out_request(None, Some("")).await.unwrap();
        assert!(!request.url.contains("post_logout_redirect_uri"));
    }

    #[tokio::test]
    async fn missing_end_session_endpoint_is_reported() {
        let mut discovery = discovery_document();
        discovery
            .as_object_mut()
            .unwrap()
            .remove("end_session_endpoint");
        let fetcher = StaticFetcher::new().with_json(
            "https://idp.example.com/.well-known/openid-configuration",
            discovery,
        );
        let (client, _store) = client_with(ClientConfig::test_default(), fetcher);

        assert!(matches!(
            client.build_sign_out_request(None, None).await,
            Err(Error::MissingEndSessionEndpoint)
        ));
    }
}
