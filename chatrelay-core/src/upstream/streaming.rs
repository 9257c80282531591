//! Streaming support for upstream responses

use super::error::UpstreamError;
use super::types::StreamChunk;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// Lazy, finite sequence of partial-completion events
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, UpstreamError>> + Send>>;

/// Parse the Server-Sent Events body of an upstream streaming response.
///
/// The upstream terminates its stream with a `data: [DONE]` sentinel,
/// which is dropped here; the relay emits its own terminal record.
pub fn parse_stream(
    stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
) -> DeltaStream {
    let event_stream = stream.eventsource();

    Box::pin(event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                if event.data == "[DONE]" {
                    return None;
                }

                match serde_json::from_str::<StreamChunk>(&event.data) {
                    Ok(chunk) => Some(Ok(chunk)),
                    Err(e) => {
                        // Skip malformed chunks but keep the stream alive.
                        tracing::warn!("Failed to parse upstream stream chunk: {}", e);
                        None
                    }
                }
            }
            Err(e) => Some(Err(UpstreamError::Parse(format!("Stream error: {}", e)))),
        }
    }))
}
