//! HTTP request handlers.

use axum::{
    body::Bytes,
    extract::{Extension, State},
};

use super::relay::RelayResponse;
use super::server::{AppState, RequestId};
use super::types::ChatCompletionRequest;
use crate::error::Error;

/// Handle POST / and POST /chat/completions
///
/// The body is read raw so that parsing does not depend on the caller's
/// content type; it must still be a JSON object.
pub async fn chat_completions(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> Result<RelayResponse, Error> {
    let request = ChatCompletionRequest::from_slice(&body).map_err(|e| {
        tracing::warn!(request_id = %request_id, error = %e, "Rejected inbound request");
        e
    })?;

    tracing::info!(
        request_id = %request_id,
        model = ?request.model(),
        stream = request.is_streaming(),
        "Received chat completion request"
    );

    state.relay.forward(&request).await
}
