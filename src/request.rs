//! Parsed HTTP request.
use crate::charset::{self, Charset};
use crate::h1::parser::RequestLine;
use crate::headers::standard::{CONTENT_TYPE, HOST};
use crate::headers::{AsHeaderName, HeaderMap, HeaderValue};
use crate::http::{Method, Version};

/// Request line and headers.
#[derive(Debug, Clone, Default)]
pub struct Parts {
    pub method: Method,
    /// Request path, without the query.
    pub uri: String,
    pub query: Option<String>,
    /// Protocol token as received, empty for HTTP/0.9.
    pub protocol: String,
    pub headers: HeaderMap,
}

/// An HTTP request, reused across the requests of a connection.
///
/// The body is not part of the request, it is read through the connection.
#[derive(Debug, Default)]
pub struct Request {
    parts: Parts,
    version: Option<Version>,
    content_length: Option<u64>,
    expect_continue: bool,
}

impl Request {
    delegate! {
        /// Returns shared reference to [`Method`].
        method() -> Method;
        /// Returns shared reference to [`HeaderMap`].
        headers() -> HeaderMap;
    }

    #[inline]
    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    /// Request path, e.g. `/a/b` for `/a/b?x=1`.
    #[inline]
    pub fn uri(&self) -> &str {
        &self.parts.uri
    }

    /// Query string without the `?`, e.g. `x=1` for `/a/b?x=1`.
    #[inline]
    pub fn query(&self) -> Option<&str> {
        self.parts.query.as_deref()
    }

    #[inline]
    pub fn protocol(&self) -> &str {
        &self.parts.protocol
    }

    /// Resolved protocol version, `None` until the request was prepared or if unsupported.
    #[inline]
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    #[inline]
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&HeaderValue> {
        self.parts.headers.get(name)
    }

    pub fn host(&self) -> Option<&HeaderValue> {
        self.parts.headers.get(HOST)
    }

    /// Declared body length, `None` for chunked bodies and requests without a body.
    #[inline]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn content_type(&self) -> Option<String> {
        self.parts.headers.get(CONTENT_TYPE).map(HeaderValue::to_latin1)
    }

    /// Charset declared by the `Content-Type` parameter, if any.
    pub fn charset(&self) -> Option<Charset> {
        let content_type = self.content_type()?;
        charset::charset_param(&content_type).and_then(Charset::for_label)
    }

    #[inline]
    pub fn expects_continue(&self) -> bool {
        self.expect_continue
    }

    // ===== Connection side =====

    pub(crate) fn set_line(&mut self, line: RequestLine) {
        self.parts.method = Method::from_token(&line.method);
        self.parts.uri = line.uri;
        self.parts.query = line.query;
        self.parts.protocol = line.protocol;
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    pub(crate) fn set_version(&mut self, version: Option<Version>) {
        self.version = version;
    }

    /// Force the protocol, so an error response can be written after a malformed request.
    pub(crate) fn force_http11(&mut self) {
        self.parts.protocol.clear();
        self.parts.protocol.push_str(Version::HTTP_11.as_str());
        self.version = Some(Version::HTTP_11);
    }

    pub(crate) fn set_content_length(&mut self, len: Option<u64>) {
        self.content_length = len;
    }

    pub(crate) fn set_expect_continue(&mut self, expect: bool) {
        self.expect_continue = expect;
    }

    /// Forget everything about the previous request, keeping allocations.
    pub fn recycle(&mut self) {
        self.parts.method = Method::GET;
        self.parts.uri.clear();
        self.parts.query = None;
        self.parts.protocol.clear();
        self.parts.headers.clear();
        self.version = None;
        self.content_length = None;
        self.expect_continue = false;
    }
}

// ===== Macros =====

macro_rules! delegate {
    (
        $(
            $(#[$doc:meta])*
            $mref:ident() -> $ty:ty;
        )*
    ) => {
        $(
            $(#[$doc])*
            #[inline]
            pub fn $mref(&self) -> &$ty {
                &self.parts.$mref
            }
        )*
    };
}

use {delegate};
