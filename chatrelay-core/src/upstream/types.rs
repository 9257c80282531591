//! Azure OpenAI wire types
//!
//! These types match the chat-completions API format and are used for
//! serialization when communicating with the upstream endpoint. Only
//! the fields the relay actually reads are modeled; everything else is
//! ignored during deserialization.

use crate::protocol::Message;
use serde::{Deserialize, Serialize};

/// Chat completion request body
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub messages: &'a [Message],

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Chat completion response (batch mode)
#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

impl CompletionResponse {
    /// First-choice message text, or `None` when the upstream returned
    /// no choices or an empty message.
    pub fn first_choice_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
    }
}

/// A single completion choice
#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub message: ChoiceMessage,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The message carried by a completion choice
#[derive(Debug, Default, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Streaming chunk (one partial-completion event)
#[derive(Debug, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

impl StreamChunk {
    /// Incremental text carried by this chunk, if any.
    pub fn delta_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }

    /// Whether this chunk carries a finish indicator. Once observed,
    /// no further chunks are consumed even if more remain.
    pub fn finished(&self) -> bool {
        self.choices
            .first()
            .is_some_and(|choice| choice.finish_reason.is_some())
    }
}

/// Streaming choice
#[derive(Debug, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: ChunkDelta,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental delta for streaming
#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub content: Option<String>,
}

/// Upstream error response body
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

/// Upstream error detail
#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
}
