//! SSE (Server-Sent Events) streaming for character-paced responses.
//!
//! Converts a [`StreamSession`] into an HTTP body that flushes one framed
//! chunk at a time, terminated by `data: [DONE]`.

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::stream::Stream;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::error;

use crate::completion::emitter::StreamSession;
use crate::completion::framer::ChunkFramer;

/// Framed byte stream for one session.
pub fn session_to_sse_stream(
    session: StreamSession,
    delay: Duration,
) -> impl Stream<Item = Result<Bytes, serde_json::Error>> {
    let framer = ChunkFramer::for_session(&session);

    session.into_paced_stream(delay).map(move |unit| {
        framer.frame(&unit).inspect_err(|e| {
            error!(unit = ?unit, "Failed to encode chunk, abandoning stream: {e}");
        })
    })
}

/// Wrap a session as a `text/event-stream` response.
pub fn sse_response(session: StreamSession, delay: Duration) -> Response {
    (
        [(CONTENT_TYPE, "text/event-stream"), (CACHE_CONTROL, "no-cache")],
        Body::from_stream(session_to_sse_stream(session, delay)),
    )
        .into_response()
}
