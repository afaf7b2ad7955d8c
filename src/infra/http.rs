//! Outbound HTTP client on `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::RequesterConfig;
use crate::core::{
    OutboundClient, OutboundRequest, RequesterError, ResponseData, ResponseHeaders,
    UNKNOWN_CONTENT_LENGTH,
};

/// [`OutboundClient`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Build a client with an overall request timeout and a connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RequesterError::Config`] when the TLS backend cannot be initialised.
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self, RequesterError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| RequesterError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }

    /// Build a client with the timeouts from configuration.
    ///
    /// # Errors
    ///
    /// See [`ReqwestClient::new`].
    pub fn from_config(cfg: &RequesterConfig) -> Result<Self, RequesterError> {
        Self::new(cfg.http_timeout(), cfg.http_connect_timeout())
    }

    /// Wrap an already configured client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OutboundClient for ReqwestClient {
    async fn execute(&self, request: OutboundRequest) -> Result<ResponseData, RequesterError> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RequesterError::Outbound(e.to_string()))?;

        let mut headers = ResponseHeaders::new();
        for (name, value) in response.headers() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        let content_length = response
            .content_length()
            .and_then(|len| i64::try_from(len).ok())
            .unwrap_or(UNKNOWN_CONTENT_LENGTH);
        let status_code = response.status().as_u16();
        debug!(status_code, content_length, "outbound response received");

        Ok(ResponseData {
            status_code,
            headers,
            content_length,
        })
    }
}
