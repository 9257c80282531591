//! Upstream completion capability
//!
//! The relay treats the hosted language-model provider as an opaque
//! capability: one request in, either a single completion or a lazy,
//! finite, non-restartable sequence of partial completions out. This
//! module implements that capability against the Azure OpenAI
//! chat-completions API. No retry happens at this layer; every failure
//! is terminal for the turn.

pub mod client;
pub mod error;
pub mod streaming;
pub mod types;

pub use client::AzureClient;
pub use error::{UpstreamError, UpstreamResult};
pub use streaming::DeltaStream;
pub use types::{CompletionResponse, StreamChunk};
