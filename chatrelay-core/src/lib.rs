//! Chatrelay Core Library
//!
//! This crate provides the shared machinery for the chatrelay system:
//! protocol types, the upstream completion client, relay event-stream
//! framing and parsing, and client-side session state. The server and
//! terminal client crates are thin frontends over these modules.

pub mod config;
pub mod protocol;
pub mod session;
pub mod sse;
pub mod upstream;

/// Returns the version of the chatrelay core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
