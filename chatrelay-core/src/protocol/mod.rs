//! Protocol module for the relay request/response structures
//!
//! These are the payloads exchanged between the browser (or terminal)
//! consumer and the relay server. They are deliberately small: the
//! conversation is sent by value on every request and the server keeps
//! no session state between requests.

pub mod types;

pub use types::{ChatReply, ChatRequest, ErrorBody, Message, Role};
