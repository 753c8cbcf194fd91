//! Connector configuration.
use std::time::Duration;

use crate::charset::Charset;
use crate::matches::{ByteClass, RELAXABLE, STRICT_PATH, STRICT_QUERY};

/// Limits, timeouts and parsing policy shared by the connections of one server.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum size of the request line plus request headers.
    pub max_http_header_size: usize,
    /// Extra wire buffer space used to read request bodies.
    pub socket_read_buffer_size: usize,
    /// Maximum size of the serialized status line plus response headers.
    pub max_response_header_size: usize,
    /// Application side byte buffer for request bodies.
    pub input_buffer_size: usize,
    /// Application side byte buffer for response bodies.
    pub output_buffer_size: usize,
    /// Initial character buffer for request bodies read as text.
    pub char_buffer_size: usize,
    /// Character buffers grown past this are replaced on recycle, and mark look-ahead is capped
    /// by it unless the mark explicitly asks for more.
    pub char_buffer_ceiling: usize,
    /// A marked character buffer is only compacted once its capacity exceeds
    /// `char_compact_factor * char_buffer_size`.
    pub char_compact_factor: usize,
    /// Window used when scanning for a line terminator.
    pub max_line_length: usize,
    /// Read timeout while waiting for the next request on a kept-alive connection.
    pub keep_alive_timeout: Option<Duration>,
    /// Read timeout while a request is in progress.
    pub connection_timeout: Option<Duration>,
    /// Number of requests served on a connection before keep-alive is refused.
    pub max_keep_alive_requests: Option<usize>,
    /// Fail the request on a malformed header line instead of skipping it.
    pub reject_illegal_header: bool,
    /// Extra bytes accepted in the request path, a subset of `"<>[\]^`{|}`.
    pub relaxed_path_chars: String,
    /// Extra bytes accepted in the query string, a subset of `"<>[\]^`{|}`.
    pub relaxed_query_chars: String,
    pub send_reason_phrase: bool,
    pub server_header: Option<String>,
    pub default_request_charset: Charset,
    pub default_response_charset: Charset,
    /// Idle converters kept per charset by the converter pool.
    pub max_idle_converters: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_http_header_size: 8 * 1024,
            socket_read_buffer_size: 8 * 1024,
            max_response_header_size: 8 * 1024,
            input_buffer_size: 8 * 1024,
            output_buffer_size: 8 * 1024,
            char_buffer_size: 8 * 1024,
            char_buffer_ceiling: 64 * 1024,
            char_compact_factor: 2,
            max_line_length: 4096,
            keep_alive_timeout: Some(Duration::from_secs(20)),
            connection_timeout: Some(Duration::from_secs(20)),
            max_keep_alive_requests: Some(100),
            reject_illegal_header: true,
            relaxed_path_chars: String::new(),
            relaxed_query_chars: String::new(),
            send_reason_phrase: true,
            server_header: None,
            default_request_charset: Charset::Latin1,
            default_response_charset: Charset::Latin1,
            max_idle_converters: 32,
        }
    }
}

impl Config {
    /// Load configuration from `H1WIRE_*` environment variables.
    ///
    /// Missing or unparsable variables keep their default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        let num = |key: &str| lookup(key).and_then(|v| v.trim().parse::<usize>().ok());
        let secs = |key: &str| num(key).map(|v| (v != 0).then(|| Duration::from_secs(v as u64)));
        let flag = |key: &str| {
            lookup(key).and_then(|v| match v.trim() {
                "1" | "true" | "yes" => Some(true),
                "0" | "false" | "no" => Some(false),
                _ => None,
            })
        };

        if let Some(v) = num("H1WIRE_MAX_HEADER_SIZE") {
            cfg.max_http_header_size = v;
        }
        if let Some(v) = num("H1WIRE_MAX_RESPONSE_HEADER_SIZE") {
            cfg.max_response_header_size = v;
        }
        if let Some(v) = num("H1WIRE_SOCKET_BUFFER") {
            cfg.socket_read_buffer_size = v;
        }
        if let Some(v) = num("H1WIRE_OUTPUT_BUFFER") {
            cfg.output_buffer_size = v;
        }
        if let Some(v) = secs("H1WIRE_KEEP_ALIVE_TIMEOUT") {
            cfg.keep_alive_timeout = v;
        }
        if let Some(v) = secs("H1WIRE_CONNECTION_TIMEOUT") {
            cfg.connection_timeout = v;
        }
        if let Some(v) = num("H1WIRE_MAX_KEEP_ALIVE_REQUESTS") {
            cfg.max_keep_alive_requests = (v != 0).then_some(v);
        }
        if let Some(v) = flag("H1WIRE_REJECT_ILLEGAL_HEADER") {
            cfg.reject_illegal_header = v;
        }
        if let Some(v) = lookup("H1WIRE_RELAXED_PATH_CHARS") {
            cfg.relaxed_path_chars = v;
        }
        if let Some(v) = lookup("H1WIRE_RELAXED_QUERY_CHARS") {
            cfg.relaxed_query_chars = v;
        }
        if let Some(v) = lookup("H1WIRE_SERVER_HEADER") {
            cfg.server_header = Some(v);
        }

        cfg
    }

    /// Bytes accepted in the request path.
    pub fn path_class(&self) -> ByteClass {
        STRICT_PATH.with(&relaxable(&self.relaxed_path_chars))
    }

    /// Bytes accepted in the query string.
    pub fn query_class(&self) -> ByteClass {
        STRICT_QUERY.with(&relaxable(&self.relaxed_query_chars))
    }
}

fn relaxable(chars: &str) -> Vec<u8> {
    chars.bytes().filter(|b| RELAXABLE.contains(b)).collect()
}
