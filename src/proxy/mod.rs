//! HTTP proxy server module.
//!
//! This module provides the HTTP surface that accepts chat completion
//! requests and relays them to the upstream API.

mod handlers;
pub mod relay;
mod server;
pub mod stream;
pub mod types;

pub use relay::{Relay, RelayResponse, EVENT_STREAM_CONTENT_TYPE};
pub use server::{
    create_router, run_server, AppState, RequestId, MAX_REQUEST_BODY_BYTES, REQUEST_ID_HEADER,
};
pub use stream::{relay_body, RelayStream};
pub use types::ChatCompletionRequest;
