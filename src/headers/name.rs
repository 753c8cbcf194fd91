use std::borrow::Cow;

use super::error::HeaderError;
use crate::matches;

/// HTTP Header name.
///
/// The original spelling is kept for serialization, comparison ignores ASCII case.
#[derive(Clone)]
pub struct HeaderName {
    name: Cow<'static, str>,
}

impl HeaderName {
    /// Create header name from static string.
    ///
    /// # Panics
    ///
    /// Panics if the input is not a valid token.
    #[inline]
    pub const fn from_static(name: &'static str) -> Self {
        match validate(name.as_bytes()) {
            Ok(()) => Self { name: Cow::Borrowed(name) },
            Err(err) => err.panic_const(),
        }
    }

    /// Create header name by copying from slice of bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the input is empty or not a valid token.
    pub fn from_slice(name: &[u8]) -> Result<Self, HeaderError> {
        validate(name)?;
        // token bytes are ASCII
        let name = name.iter().map(|&b| b as char).collect::<String>();
        Ok(Self { name: Cow::Owned(name) })
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

const fn validate(mut bytes: &[u8]) -> Result<(), HeaderError> {
    if bytes.is_empty() {
        return Err(HeaderError::Empty);
    }
    while let [byte, rest @ ..] = bytes {
        if !matches::is_token(*byte) {
            return Err(HeaderError::Invalid);
        }
        bytes = rest;
    }
    Ok(())
}

impl PartialEq for HeaderName {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for HeaderName {}

impl std::str::FromStr for HeaderName {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(s.as_bytes())
    }
}

impl std::fmt::Display for HeaderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl std::fmt::Debug for HeaderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.name)
    }
}

// ===== Lookup =====

/// A type that can be used to look up a header, compared without regard to ASCII case.
pub trait AsHeaderName {
    fn as_header_str(&self) -> &str;
}

impl AsHeaderName for HeaderName {
    #[inline]
    fn as_header_str(&self) -> &str {
        self.as_str()
    }
}

impl AsHeaderName for &HeaderName {
    #[inline]
    fn as_header_str(&self) -> &str {
        self.as_str()
    }
}

impl AsHeaderName for &str {
    #[inline]
    fn as_header_str(&self) -> &str {
        self
    }
}

impl AsHeaderName for String {
    #[inline]
    fn as_header_str(&self) -> &str {
        self
    }
}

/// Header names the connector itself reads or writes.
pub mod standard {
    use super::HeaderName;

    pub const CONNECTION: HeaderName = HeaderName::from_static("Connection");
    pub const CONTENT_LENGTH: HeaderName = HeaderName::from_static("Content-Length");
    pub const CONTENT_TYPE: HeaderName = HeaderName::from_static("Content-Type");
    pub const EXPECT: HeaderName = HeaderName::from_static("Expect");
    pub const HOST: HeaderName = HeaderName::from_static("Host");
    pub const SERVER: HeaderName = HeaderName::from_static("Server");
    pub const TRANSFER_ENCODING: HeaderName = HeaderName::from_static("Transfer-Encoding");
}
