//! Relay event-stream wire format
//!
//! The relay forwards upstream deltas to its consumers as a
//! line-delimited event stream. Framing is a fixed textual protocol,
//! implemented as explicit string templates on the way out and an
//! incremental record parser on the way in. Every data payload is
//! JSON-quoted, so a fragment containing newlines or the literal
//! terminator token cannot be misread as stream control.
//!
//! Record shapes:
//! - `data: <json-string>\n\n` - one token fragment
//! - `event: done\ndata: [DONE]\n\n` - terminal record
//! - `event: error\ndata: <json-string>\n\n` - mid-stream failure

/// Media type declared by streaming responses
pub const EVENT_STREAM_MIME: &str = "text/event-stream";

/// Terminator token carried by the terminal record's data field
pub const DONE_TOKEN: &str = "[DONE]";

/// Event tag of the terminal record
pub const DONE_EVENT: &str = "done";

/// Event tag of the mid-stream failure record
pub const ERROR_EVENT: &str = "error";

const RECORD_SEPARATOR: &str = "\n\n";

/// Frame one token fragment.
pub fn delta_record(text: &str) -> String {
    // Serializing a string slice to JSON cannot fail.
    let payload = serde_json::to_string(text).unwrap_or_default();
    format!("data: {}\n\n", payload)
}

/// The terminal record closing a successful stream.
pub fn done_record() -> &'static str {
    "event: done\ndata: [DONE]\n\n"
}

/// Frame a mid-stream failure. Fragments already delivered before this
/// record remain valid and are not retracted.
pub fn error_record(message: &str) -> String {
    let payload = serde_json::to_string(message).unwrap_or_default();
    format!("event: error\ndata: {}\n\n", payload)
}

/// One parsed event-stream record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Value of the `event:` field, if present
    pub event: Option<String>,

    /// Joined value of the `data:` fields
    pub data: String,
}

/// Incremental record parser
///
/// Raw reads are accumulated and split on the blank-line record
/// separator; complete records are drained while the trailing partial
/// record stays buffered for the next read. The parse result is
/// independent of how the byte stream was chunked, down to a
/// multi-byte character split across two reads.
#[derive(Debug, Default)]
pub struct RecordBuffer {
    pending: String,
    partial: Vec<u8>,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw transport read and drain every complete record.
    ///
    /// A trailing incomplete UTF-8 sequence is held back until the
    /// bytes that finish it arrive; truly invalid bytes are replaced.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<Record> {
        self.partial.extend_from_slice(chunk);

        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.partial) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.partial.clear();
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.partial[..valid_up_to]));
                    match e.error_len() {
                        Some(invalid_len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.partial.drain(..valid_up_to + invalid_len);
                        }
                        None => {
                            self.partial.drain(..valid_up_to);
                            break;
                        }
                    }
                }
            }
        }

        self.push(&text)
    }

    /// Feed one decoded chunk and drain every complete record.
    ///
    /// Records without a data field are dropped here; the caller never
    /// sees them.
    pub fn push(&mut self, chunk: &str) -> Vec<Record> {
        self.pending.push_str(chunk);

        let mut records = Vec::new();
        while let Some(index) = self.pending.find(RECORD_SEPARATOR) {
            let raw: String = self
                .pending
                .drain(..index + RECORD_SEPARATOR.len())
                .collect();
            if let Some(record) = parse_record(&raw) {
                records.push(record);
            }
        }
        records
    }
}

fn parse_record(raw: &str) -> Option<Record> {
    let mut event = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in raw.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(value) = line.strip_prefix("event:") {
            event = Some(value.strip_prefix(' ').unwrap_or(value).to_string());
        } else if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    // A record with no data field is ignored.
    if data_lines.is_empty() {
        return None;
    }

    Some(Record {
        event,
        data: data_lines.join("\n"),
    })
}

/// What a record means to the stream consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerEvent {
    /// One decoded token fragment to append
    Delta(String),
    /// The stream completed normally
    Done,
    /// The stream failed mid-flight; the message describes the failure
    Error(String),
}

/// Classify a parsed record.
///
/// A record is terminal only when it carries BOTH the `done` event tag
/// and the literal terminator token; either one alone is treated as
/// ordinary data. Empty fragments yield `None`.
pub fn classify(record: &Record) -> Option<ConsumerEvent> {
    match record.event.as_deref() {
        Some(DONE_EVENT) if record.data == DONE_TOKEN => Some(ConsumerEvent::Done),
        Some(ERROR_EVENT) => Some(ConsumerEvent::Error(decode_fragment(&record.data))),
        _ => {
            let text = decode_fragment(&record.data);
            if text.is_empty() {
                None
            } else {
                Some(ConsumerEvent::Delta(text))
            }
        }
    }
}

/// JSON-decode a data payload, falling back to the raw text when the
/// payload is not a JSON string.
fn decode_fragment(data: &str) -> String {
    serde_json::from_str::<String>(data).unwrap_or_else(|_| data.to_string())
}
