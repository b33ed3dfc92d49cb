//! HTTP server setup and configuration.

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::post,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::handlers;
use super::relay::Relay;
use crate::config::Config;

/// Response header carrying the per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Largest inbound body accepted; chat requests may carry base64 images.
pub const MAX_REQUEST_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

/// Correlation ID assigned to every inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let request_id = RequestId(Uuid::new_v4());
    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Both paths are the same relay
        .route("/", post(handlers::chat_completions))
        .route("/chat/completions", post(handlers::chat_completions))
        // State and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(assign_request_id)),
        )
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();

    let relay = Relay::new(&config.upstream)?;
    tracing::info!(
        upstream = %relay.upstream_url(),
        timeout_secs = config.upstream.timeout.as_secs(),
        "Configured upstream"
    );

    let state = AppState {
        relay: Arc::new(relay),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting groq-relay proxy server");

    axum::serve(listener, app).await?;

    Ok(())
}
