//! Pass-through byte stream for streaming responses.
//!
//! Provides [`RelayStream`], which forwards upstream chunks verbatim and in
//! order while tracking how much was relayed. Dropping it (for example when
//! the caller disconnects) drops the upstream stream and releases the
//! upstream connection.

use std::fmt::Display;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::body::Body;
use axum::BoxError;
use bytes::Bytes;
use futures::{Stream, StreamExt};

/// Stream wrapper that relays upstream chunks unchanged.
pub struct RelayStream<S> {
    inner: S,
    chunks: u64,
    bytes: u64,
    finished: bool,
}

impl<S> RelayStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            chunks: 0,
            bytes: 0,
            finished: false,
        }
    }

    /// Number of chunks relayed so far.
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    /// Number of bytes relayed so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl<S, E> Stream for RelayStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match ready!(self.inner.poll_next_unpin(cx)) {
            Some(Ok(chunk)) => {
                self.chunks += 1;
                self.bytes += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                // The caller sees a truncated body; no error chunk is synthesized.
                self.finished = true;
                tracing::error!(
                    error = %e,
                    chunks = self.chunks,
                    bytes = self.bytes,
                    "Upstream stream failed mid-flight"
                );
                Poll::Ready(Some(Err(e)))
            }
            None => {
                self.finished = true;
                tracing::debug!(
                    chunks = self.chunks,
                    bytes = self.bytes,
                    "Upstream stream completed"
                );
                Poll::Ready(None)
            }
        }
    }
}

impl<S> Drop for RelayStream<S> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::info!(
                chunks = self.chunks,
                bytes = self.bytes,
                "Client disconnected before upstream stream finished"
            );
        }
    }
}

/// Build a response body that relays `stream` chunk by chunk.
pub fn relay_body<S, E>(stream: S) -> Body
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<BoxError> + Display + 'static,
{
    Body::from_stream(RelayStream::new(Box::pin(stream)))
}
