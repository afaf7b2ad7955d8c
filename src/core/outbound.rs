//! Outbound HTTP port.

use async_trait::async_trait;

use super::error::RequesterError;
use super::task::{RequestHeaders, ResponseData, Task};

/// A fully built outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// Validated HTTP method.
    pub method: reqwest::Method,
    /// Parsed target URL.
    pub url: reqwest::Url,
    /// Headers to set on the request.
    pub headers: RequestHeaders,
    /// Serialized JSON body.
    pub body: Option<Vec<u8>>,
}

impl OutboundRequest {
    /// Build the call a stored task describes.
    ///
    /// # Errors
    ///
    /// Returns [`RequesterError::Outbound`] when the method or URL cannot be
    /// parsed, and [`RequesterError::Serialization`] when the body cannot be encoded.
    pub fn from_task(task: &Task) -> Result<Self, RequesterError> {
        let method = reqwest::Method::from_bytes(task.method.as_bytes())
            .map_err(|e| RequesterError::Outbound(format!("invalid method `{}`: {e}", task.method)))?;
        let url = reqwest::Url::parse(&task.url)
            .map_err(|e| RequesterError::Outbound(format!("invalid url `{}`: {e}", task.url)))?;
        let body = task.body.as_ref().map(serde_json::to_vec).transpose()?;

        Ok(Self {
            method,
            url,
            headers: task.headers.clone().unwrap_or_default(),
            body,
        })
    }
}

/// Executes outbound calls.
#[async_trait]
pub trait OutboundClient: Send + Sync {
    /// Issue the call and report status, headers and content length.
    ///
    /// Network errors and timeouts are reported as [`RequesterError::Outbound`];
    /// any HTTP status, including 4xx and 5xx, is a successful call.
    async fn execute(&self, request: OutboundRequest) -> Result<ResponseData, RequesterError>;
}
