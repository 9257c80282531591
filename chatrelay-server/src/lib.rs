//! Chatrelay server library
//!
//! Exposes the router and handler so integration tests can drive the
//! HTTP surface without binding a socket.

pub mod api;
