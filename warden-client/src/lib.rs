//! Blocking client for the warden control socket.
//!
//! The control protocol is JSON newline-delimited over a unix stream socket:
//! one request line, one response line, per query.

mod client;
mod error;
pub mod protocol;

pub use client::{Client, DEFAULT_SOCKET, SOCKET_ENV};
pub use error::ClientError;
pub use protocol::{ControlRequest, ControlResponse};
