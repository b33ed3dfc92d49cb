//! Error types for groq-relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for groq-relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for groq-relay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Upstream request timed out: {0}")]
    Timeout(String),

    #[error("Upstream request failed: {0}")]
    Upstream(reqwest::Error),

    #[error("Upstream returned an invalid response: {0}")]
    UpstreamProtocol(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Upstream(e)
        }
    }
}

impl Error {
    /// HTTP status returned to the caller for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::UpstreamProtocol(_) => StatusCode::BAD_GATEWAY,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Error::BadRequest(_) => "invalid_request_error",
            Error::Timeout(_) => "upstream_timeout",
            Error::Upstream(_) | Error::UpstreamProtocol(_) => "upstream_error",
            Error::Internal(_) => "relay_error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // OpenAI-compatible error format
        let body = serde_json::json!({
            "error": {
                "message": self.to_string(),
                "type": self.error_type(),
                "code": status.as_u16()
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Timeout("x".into()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            Error::UpstreamProtocol("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let response = Error::BadRequest("body is not valid JSON".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert_eq!(json["error"]["code"], 400);
        assert_eq!(
            json["error"]["message"],
            "Invalid request: body is not valid JSON"
        );
    }
}
