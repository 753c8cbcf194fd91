//! HTTP response under construction.
use crate::charset::{self, Charset};
use crate::error::{Error, Kind, Misuse};
use crate::filter::FilterId;
use crate::headers::standard::{CONTENT_LENGTH, CONTENT_TYPE};
use crate::headers::{AsHeaderName, HeaderMap, HeaderName, HeaderValue};
use crate::http::StatusCode;

/// An HTTP response, reused across the requests of a connection.
///
/// Every mutation is rejected with [`Misuse::Committed`] once the head was written to the
/// socket. `Content-Length` and `Content-Type` are kept apart from the other headers, they
/// drive body framing and the writer charset.
#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    message: Option<String>,
    headers: HeaderMap,
    content_length: Option<u64>,
    content_type: Option<String>,
    charset: Option<Charset>,
    filters: Vec<FilterId>,
    committed: bool,
    writer_used: bool,
}

impl Response {
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Custom reason phrase, if set.
    #[inline]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    #[inline]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Charset of the body writer, `None` when left to the configured default.
    #[inline]
    pub fn charset(&self) -> Option<Charset> {
        self.charset
    }

    /// Returns `true` once the head was written, headers can no longer change.
    #[inline]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    fn check(&self) -> Result<(), Error> {
        match self.committed {
            true => Err(Misuse::Committed.into()),
            false => Ok(()),
        }
    }

    // ===== Mutation =====

    pub fn set_status(&mut self, status: StatusCode) -> Result<(), Error> {
        self.check()?;
        self.status = status;
        self.message = None;
        Ok(())
    }

    /// Set the reason phrase, replacing the registered one.
    pub fn set_message(&mut self, message: impl Into<String>) -> Result<(), Error> {
        self.check()?;
        let message = message.into();
        if message.bytes().any(|b| b < 0x20 || b == 0x7f) {
            return Err(Kind::InvalidResponseHeader.into());
        }
        self.message = Some(message);
        Ok(())
    }

    /// Set a header, replacing every previous value.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), Error> {
        self.check()?;
        if self.special(&name, &value)? {
            return Ok(());
        }
        self.headers.insert(name, value);
        Ok(())
    }

    /// Add a header value, keeping previous ones.
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), Error> {
        self.check()?;
        if self.special(&name, &value)? {
            return Ok(());
        }
        self.headers.append(name, value);
        Ok(())
    }

    pub fn remove_header<K: AsHeaderName>(&mut self, name: K) -> Result<Option<HeaderValue>, Error> {
        self.check()?;
        Ok(self.headers.remove(name))
    }

    /// Route framing headers to their dedicated fields.
    fn special(&mut self, name: &HeaderName, value: &HeaderValue) -> Result<bool, Error> {
        if *name == CONTENT_LENGTH {
            let len = value.to_u64().ok_or(Kind::InvalidResponseHeader)?;
            self.content_length = Some(len);
            return Ok(true);
        }
        if *name == CONTENT_TYPE {
            self.set_content_type(value.to_latin1())?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn set_content_length(&mut self, len: Option<u64>) -> Result<(), Error> {
        self.check()?;
        self.content_length = len;
        Ok(())
    }

    /// Set the media type, a `charset` parameter also sets the writer charset.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) -> Result<(), Error> {
        self.check()?;
        let content_type = content_type.into();
        if !HeaderValue::is_valid(content_type.as_bytes()) {
            return Err(Kind::InvalidResponseHeader.into());
        }
        if let Some(cs) = charset::charset_param(&content_type).and_then(Charset::for_label) {
            self.charset = Some(cs);
        }
        self.content_type = Some(content_type);
        Ok(())
    }

    /// Set the charset of the body writer.
    ///
    /// Has no effect once the writer was used.
    pub fn set_charset(&mut self, charset: Charset) -> Result<(), Error> {
        self.check()?;
        if !self.writer_used {
            self.charset = Some(charset);
        }
        Ok(())
    }

    /// Activate a filter registered on the connection for this response, it wraps the
    /// transfer coding.
    pub fn add_filter(&mut self, id: FilterId) -> Result<(), Error> {
        self.check()?;
        if !self.filters.contains(&id) {
            self.filters.push(id);
        }
        Ok(())
    }

    /// Clear status, headers and filters of an uncommitted response.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.check()?;
        let writer_used = self.writer_used;
        self.recycle();
        self.writer_used = writer_used;
        Ok(())
    }

    // ===== Connection side =====

    pub(crate) fn filters(&self) -> &[FilterId] {
        &self.filters
    }

    pub(crate) fn set_committed(&mut self) {
        self.committed = true;
    }

    pub(crate) fn set_writer_used(&mut self) {
        self.writer_used = true;
    }

    /// `Content-Type` value as written on the wire.
    pub(crate) fn content_type_header(&self, default: Charset) -> Option<String> {
        let content_type = self.content_type.as_deref()?;
        if !self.writer_used || charset::charset_param(content_type).is_some() {
            return Some(content_type.to_owned());
        }
        let cs = self.charset.unwrap_or(default);
        Some(format!("{content_type};charset={cs}"))
    }

    pub fn recycle(&mut self) {
        self.status = StatusCode::OK;
        self.message = None;
        self.headers.clear();
        self.content_length = None;
        self.content_type = None;
        self.charset = None;
        self.filters.clear();
        self.committed = false;
        self.writer_used = false;
    }
}
