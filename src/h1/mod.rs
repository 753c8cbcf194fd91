//! HTTP/1.1 Protocol.
//!
//! - [`parser`] contains the resumable request line and header parser.
//! - [`Connection`] integrates the wire stages and the application adapters into single API.
mod buffer;
pub mod parser;
mod input;
mod output;
mod connection;

pub use connection::{Body, Connection, Writer};

#[cfg(test)]
mod test;

/// Outcome of reading a request head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed {
    /// A request is ready to be served.
    Ready,
    /// Non-blocking read ran out of bytes, call again once the socket is readable.
    Pending,
    /// The peer closed the connection, or the keep-alive timeout expired, between requests.
    Closed,
    /// The connection opened with the HTTP/2 connection preface.
    Http2Preface,
}
