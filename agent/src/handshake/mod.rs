//! Credential handshake over ephemeral connections.
//!
//! A client opens a short-lived connection to a server's control endpoint,
//! presents its credential and waits for a single answer. The server side
//! answers each connection once and closes it.

mod client;
mod protocol;
mod responder;

pub use client::{HandshakeClient, HandshakeOutcome};
pub use protocol::*;
pub use responder::HandshakeResponder;
