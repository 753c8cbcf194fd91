use bytes::{Bytes, BytesMut};

use super::error::HeaderError;
use crate::charset;

/// HTTP Header Value.
///
/// Owns its bytes, so a value parsed from a request stays valid after the wire buffer it was
/// read from is reused. Bytes outside ASCII are read as ISO-8859-1.
#[derive(Clone, PartialEq, Eq)]
pub struct HeaderValue {
    bytes: Bytes,
}

impl HeaderValue {
    /// Create header value from static bytes.
    ///
    /// # Panics
    ///
    /// Panics if the input is not a valid header value.
    #[inline]
    pub const fn from_static(bytes: &'static [u8]) -> Self {
        match validate(bytes) {
            Ok(()) => Self { bytes: Bytes::from_static(bytes) },
            Err(err) => err.panic_const(),
        }
    }

    /// Create header value by copying from slice of bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the input contains a control character other than horizontal tab.
    #[inline]
    pub fn from_slice<A: AsRef<[u8]>>(value: A) -> Result<Self, HeaderError> {
        validate(value.as_ref())?;
        Ok(Self { bytes: Bytes::copy_from_slice(value.as_ref()) })
    }

    /// Create header value from a decimal integer.
    pub fn from_u64(value: u64) -> Self {
        let mut buf = itoa::Buffer::new();
        Self { bytes: Bytes::copy_from_slice(buf.format(value).as_bytes()) }
    }

    /// Returns `true` if `bytes` has no control character other than horizontal tab.
    #[inline]
    pub fn is_valid(bytes: &[u8]) -> bool {
        validate(bytes).is_ok()
    }

    /// Bytes taken verbatim from a parsed header line, the parser already rejected
    /// control characters.
    pub(crate) fn from_parsed(bytes: &[u8]) -> Self {
        Self { bytes: Bytes::copy_from_slice(bytes) }
    }

    /// Replace the content of this value.
    ///
    /// # Errors
    ///
    /// Returns error if the input contains a control character other than horizontal tab.
    pub fn set<A: AsRef<[u8]>>(&mut self, value: A) -> Result<(), HeaderError> {
        validate(value.as_ref())?;
        self.bytes = Bytes::copy_from_slice(value.as_ref());
        Ok(())
    }

    /// Append to this value with a `", "` separator, as when combining repeated fields.
    pub fn append<A: AsRef<[u8]>>(&mut self, value: A) -> Result<(), HeaderError> {
        let value = value.as_ref();
        validate(value)?;
        let mut bytes = BytesMut::with_capacity(self.bytes.len() + 2 + value.len());
        bytes.extend_from_slice(&self.bytes);
        bytes.extend_from_slice(b", ");
        bytes.extend_from_slice(value);
        self.bytes = bytes.freeze();
        Ok(())
    }

    /// Returns header value as a byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns header value as `str` if it is ASCII.
    #[inline]
    pub fn to_str(&self) -> Option<&str> {
        if self.bytes.is_ascii() {
            std::str::from_utf8(&self.bytes).ok()
        } else {
            None
        }
    }

    /// Returns header value decoded as ISO-8859-1.
    #[inline]
    pub fn to_latin1(&self) -> String {
        charset::latin1(&self.bytes)
    }

    /// Parse as a non negative decimal integer, digits only.
    pub fn to_u64(&self) -> Option<u64> {
        if self.bytes.is_empty() || !self.bytes.iter().all(u8::is_ascii_digit) {
            return None;
        }
        self.bytes
            .iter()
            .try_fold(0u64, |acc, &b| acc.checked_mul(10)?.checked_add((b - b'0') as u64))
    }

    /// Case insensitive comparison against an ASCII token, e.g. `chunked`.
    #[inline]
    pub fn eq_ignore_ascii_case(&self, other: &str) -> bool {
        self.bytes.eq_ignore_ascii_case(other.as_bytes())
    }

    /// Iterate the comma separated elements, trimmed, e.g. of `Connection: keep-alive, Upgrade`.
    pub fn elements(&self) -> impl Iterator<Item = &[u8]> {
        self.bytes
            .split(|&b| b == b',')
            .map(<[u8]>::trim_ascii)
            .filter(|e| !e.is_empty())
    }
}

const fn validate(mut bytes: &[u8]) -> Result<(), HeaderError> {
    while let [byte, rest @ ..] = bytes {
        if (*byte < 0x20 && *byte != b'\t') || *byte == 0x7f {
            return Err(HeaderError::Invalid);
        }
        bytes = rest;
    }
    Ok(())
}

impl std::str::FromStr for HeaderValue {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(s)
    }
}

impl std::fmt::Debug for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.to_latin1())
    }
}
