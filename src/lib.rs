//! HTTP/1.1 Connector
//!
//! Turns a fragmented byte stream into parsed requests, and responses back into framed bytes,
//! reusing every buffer across the requests of a connection.
//!
//! - [`h1::Connection`] ties the request parser, the body adapters and the output filter
//!   chain to a [`net::SocketHandle`].
//! - [`server`] serves connections accepted by a tokio listener.
#![warn(missing_debug_implementations)]

mod log;
mod common;
mod matches;

pub mod config;
pub mod error;
pub mod net;
pub mod http;
pub mod headers;
pub mod charset;
pub mod filter;
pub mod app;
pub mod request;
pub mod response;
pub mod h1;
pub mod server;

pub use config::Config;
pub use error::Error;
pub use h1::{Connection, Parsed};
pub use request::Request;
pub use response::Response;
