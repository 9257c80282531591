//! Client-side conversation state and turn execution
//!
//! A [`Session`] owns the ordered conversation for the lifetime of the
//! client process and sends it by value on every turn; the relay keeps
//! no state between requests. During a streamed turn exactly one
//! trailing assistant message is in progress; once the turn ends that
//! message is frozen and the next turn starts a new placeholder.

use crate::protocol::{ChatReply, ChatRequest, ErrorBody, Message, Role};
use crate::sse::{self, ConsumerEvent, RecordBuffer};
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response};
use tracing::debug;

/// Conversation state owned by the consumer
#[derive(Debug, Clone)]
pub struct Session {
    messages: Vec<Message>,
}

impl Session {
    /// Start a new session with the local, cosmetic system message.
    ///
    /// This message is part of the history the client sends; it is
    /// distinct from the instruction the relay injects server-side.
    pub fn new() -> Self {
        Self {
            messages: vec![Message::system("New session started.")],
        }
    }

    /// The conversation so far, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Content of the most recent assistant message, if any
    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
            .map(|message| message.content.as_str())
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a fragment to the trailing in-progress assistant message.
    fn extend_assistant(&mut self, fragment: &str) {
        if let Some(last) = self
            .messages
            .last_mut()
            .filter(|message| message.role == Role::Assistant)
        {
            last.content.push_str(fragment);
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// How a completed turn was delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Whether the reply arrived as an event stream
    pub streamed: bool,

    /// Error description when the turn failed; the conversation still
    /// carries an inline assistant message reporting it
    pub error: Option<String>,
}

/// Run one user turn against the relay.
///
/// Appends the user message, issues one request, and applies the reply
/// to the session. `on_delta` fires once per streamed fragment; its
/// first invocation is the first-token latency signal. Failures never
/// bubble out as errors: they are recorded inline as an assistant
/// message, leaving the conversation intact for the next turn.
pub async fn send_turn<F>(
    client: &Client,
    base_url: &str,
    session: &mut Session,
    text: impl Into<String>,
    streaming: bool,
    on_delta: F,
) -> TurnOutcome
where
    F: FnMut(&str),
{
    session.push(Message::user(text));

    let url = if streaming {
        format!("{}/api/chat?stream=1", base_url.trim_end_matches('/'))
    } else {
        format!("{}/api/chat", base_url.trim_end_matches('/'))
    };

    let mut request = client.post(&url).json(&ChatRequest {
        messages: session.messages.clone(),
    });
    if streaming {
        request = request.header(ACCEPT, sse::EVENT_STREAM_MIME);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            session.push(Message::assistant(format!("Error: {}", e)));
            return TurnOutcome {
                streamed: false,
                error: Some(e.to_string()),
            };
        }
    };

    if declares_event_stream(&response) {
        consume_stream(response, session, on_delta).await
    } else {
        consume_batch(response, session).await
    }
}

fn declares_event_stream(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(sse::EVENT_STREAM_MIME))
}

/// Incremental read loop: accumulate raw reads, drain complete records,
/// and grow the trailing assistant message until the terminal record or
/// end-of-stream.
async fn consume_stream<F>(response: Response, session: &mut Session, mut on_delta: F) -> TurnOutcome
where
    F: FnMut(&str),
{
    session.push(Message::assistant(""));

    let mut buffer = RecordBuffer::new();
    let mut body = response.bytes_stream();
    let mut error = None;

    'read: while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                let message = format!("\nError: {}", e);
                session.extend_assistant(&message);
                error = Some(e.to_string());
                break;
            }
        };

        for record in buffer.push_bytes(&chunk) {
            match sse::classify(&record) {
                Some(ConsumerEvent::Delta(fragment)) => {
                    on_delta(&fragment);
                    session.extend_assistant(&fragment);
                }
                Some(ConsumerEvent::Done) => {
                    debug!("terminal record observed");
                    break 'read;
                }
                Some(ConsumerEvent::Error(message)) => {
                    session.extend_assistant(&format!("\nError: {}", message));
                    error = Some(message);
                    break 'read;
                }
                None => {}
            }
        }
    }

    TurnOutcome {
        streamed: true,
        error,
    }
}

async fn consume_batch(response: Response, session: &mut Session) -> TurnOutcome {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|parsed| parsed.error)
            .unwrap_or_else(|_| if body.is_empty() { status.to_string() } else { body });
        session.push(Message::assistant(format!("Error: {}", detail)));
        return TurnOutcome {
            streamed: false,
            error: Some(detail),
        };
    }

    match serde_json::from_str::<ChatReply>(&body) {
        Ok(reply) => {
            session.push(Message::assistant(reply.reply));
            TurnOutcome {
                streamed: false,
                error: None,
            }
        }
        Err(e) => {
            session.push(Message::assistant(format!("Error: {}", e)));
            TurnOutcome {
                streamed: false,
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_has_local_system_message() {
        let session = Session::new();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::System);
    }

    #[test]
    fn test_extend_assistant_only_touches_trailing_assistant() {
        let mut session = Session::new();
        session.push(Message::user("hi"));
        session.extend_assistant("ignored");
        assert_eq!(session.messages().last().unwrap().content, "hi");

        session.push(Message::assistant(""));
        session.extend_assistant("Hel");
        session.extend_assistant("lo");
        assert_eq!(session.last_reply(), Some("Hello"));
    }
}
