//! HTTP transport for signed page requests.

use std::fmt::Debug;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;
use url::Url;

use crate::auth::RequestSigner;
use crate::config::CatalogConfig;
use crate::error::TransportError;
use crate::query::join_params;

/// Shared HTTP client for the catalog gateway.
///
/// Owns the reqwest client, the gateway root, and the signing collaborator.
/// Every engine in a session shares one `Transport`.
pub struct Transport {
    http: reqwest::Client,
    gateway: Url,
    signer: Arc<dyn RequestSigner>,
}

impl Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("gateway", &self.gateway.as_str())
            .finish_non_exhaustive()
    }
}

impl Transport {
    pub fn new(
        config: &CatalogConfig,
        signer: Arc<dyn RequestSigner>,
    ) -> Result<Self, TransportError> {
        let gateway = Url::parse(config.gateway_url.trim_end_matches('/'))?;
        let http = build_http_client(config)?;
        Ok(Self {
            http,
            gateway,
            signer,
        })
    }

    /// GET one page for a canonical query, auth suffix appended fresh.
    ///
    /// Returns the raw body so callers can persist it verbatim; only the
    /// query (never the auth parameters) is logged.
    pub async fn get(&self, query: &str) -> Result<Vec<u8>, TransportError> {
        let signed = join_params(query, &self.signer.auth_params());
        let url = Url::parse(&format!(
            "{}/{signed}",
            self.gateway.as_str().trim_end_matches('/')
        ))?;

        debug!(%query, "requesting catalog page");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(TransportError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }

        let bytes = response.bytes().await.map_err(TransportError::Request)?;
        Ok(bytes.to_vec())
    }
}

fn build_http_client(config: &CatalogConfig) -> Result<reqwest::Client, TransportError> {
    let mut headers = HeaderMap::new();
    for (key, value) in &config.extra_headers {
        headers.insert(HeaderName::from_str(key)?, HeaderValue::from_str(value)?);
    }

    debug!(
        gateway_url = %config.gateway_url,
        extra_headers = config.extra_headers.len(),
        "building catalog HTTP client"
    );

    let client_builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(60));

    let client_builder = if let Some(ref user_agent) = config.user_agent {
        client_builder.user_agent(user_agent)
    } else {
        client_builder
    };

    client_builder.build().map_err(TransportError::Build)
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::auth::StaticSigner;

    fn test_config(url: &str) -> CatalogConfig {
        CatalogConfig {
            gateway_url: url.to_string(),
            ..Default::default()
        }
    }

    fn transport_for(config: CatalogConfig) -> Transport {
        Transport::new(
            &config,
            Arc::new(StaticSigner::new("ts=1&apikey=pk&hash=h")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn auth_params_are_appended_to_every_request() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.path("/characters")
                .query_param("limit", "10")
                .query_param("ts", "1")
                .query_param("apikey", "pk")
                .query_param("hash", "h");
            then.status(200)
                .json_body(json!({"data": {"total": 0, "results": []}}));
        });

        let transport = transport_for(test_config(&server.base_url()));
        let body = transport.get("characters?limit=10").await.unwrap();

        mock.assert_async().await;
        assert!(!body.is_empty());
    }

    #[tokio::test]
    async fn extra_headers_and_user_agent_are_set() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.header("x-session", "abc")
                .header("user-agent", "catalog-test");
            then.status(200)
                .json_body(json!({"data": {"total": 0, "results": []}}));
        });

        let mut config = test_config(&server.base_url());
        config.user_agent = Some("catalog-test".to_string());
        config
            .extra_headers
            .insert("x-session".to_string(), "abc".to_string());

        let transport = transport_for(config);
        transport.get("comics?").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_surfaced_as_transport_error() {
        let server = MockServer::start_async().await;
        server.mock(|_, then| {
            then.status(409)
                .json_body(json!({"code": "RequestThrottled"}));
        });

        let transport = transport_for(test_config(&server.base_url()));
        let result = transport.get("comics?").await;

        match result {
            Err(TransportError::Status(status)) => assert_eq!(status.as_u16(), 409),
            other => panic!("expected status error, got: {other:?}"),
        }
    }

    #[test]
    fn invalid_gateway_url_is_rejected() {
        let result = Transport::new(
            &test_config("not a url"),
            Arc::new(StaticSigner::new("ts=1")),
        );
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }
}
