//! Upstream relay: forwards one request and returns the upstream answer
//! either as buffered JSON or as a pass-through byte stream.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use reqwest::Client;

use super::stream::relay_body;
use super::types::ChatCompletionRequest;
use crate::config::{ApiKey, UpstreamConfig};
use crate::error::{Error, Result};

/// Content type of every streaming response sent to the caller.
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Forwards chat completion requests to the configured upstream.
///
/// Holds no per-request state; the inner `Client` connection pool is shared
/// across concurrent requests.
#[derive(Clone)]
pub struct Relay {
    client: Client,
    url: String,
    api_key: ApiKey,
}

/// Upstream answer, before conversion into the caller's response.
#[derive(Debug)]
pub enum RelayResponse {
    /// Fully buffered body, validated as JSON.
    Json { status: StatusCode, body: Bytes },
    /// Upstream response whose body has not been read yet.
    Stream {
        status: StatusCode,
        upstream: reqwest::Response,
    },
}

impl Relay {
    /// Create a relay with its own HTTP client bounded by `config.timeout`.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, config))
    }

    /// Create a relay around an existing client.
    pub fn with_client(client: Client, config: &UpstreamConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn upstream_url(&self) -> &str {
        &self.url
    }

    /// Forward `request` to the upstream and return its answer.
    ///
    /// Streaming requests return as soon as upstream headers arrive. Buffered
    /// requests wait for the whole body and decode it as JSON.
    pub async fn forward(&self, request: &ChatCompletionRequest) -> Result<RelayResponse> {
        let is_streaming = request.is_streaming();

        let upstream_response = self
            .client
            .post(&self.url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .body(request.body().clone())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %self.url, "Failed to reach upstream");
                Error::from(e)
            })?;

        let status = upstream_response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, streaming = is_streaming, "Upstream returned error status");
        }

        if is_streaming {
            return Ok(RelayResponse::Stream {
                status,
                upstream: upstream_response,
            });
        }

        let bytes = upstream_response.bytes().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to read upstream response body");
            Error::from(e)
        })?;

        // Decoded only to validate; the caller gets the upstream bytes unchanged.
        serde_json::from_slice::<serde::de::IgnoredAny>(&bytes).map_err(|e| {
            tracing::error!(error = %e, len = bytes.len(), "Upstream response is not JSON");
            Error::UpstreamProtocol(format!("failed to decode upstream JSON: {}", e))
        })?;

        Ok(RelayResponse::Json {
            status,
            body: bytes,
        })
    }
}

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        match self {
            RelayResponse::Json { status, body } => (
                status,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response(),
            RelayResponse::Stream { status, upstream } => (
                status,
                [
                    (header::CONTENT_TYPE, EVENT_STREAM_CONTENT_TYPE),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                relay_body(upstream.bytes_stream()),
            )
                .into_response(),
        }
    }
}
