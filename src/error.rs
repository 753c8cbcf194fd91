//! Connector error.
use std::{fmt, io};

use crate::h1::parser::ParseError;
use crate::http::StatusCode;

/// An error raised while reading a request or writing a response.
///
/// Errors fall in four classes, see [`Error::is_malformed`], [`Error::is_limit`],
/// [`Error::is_close_now`] and [`Error::is_misuse`]. Would-block and end of stream are not
/// errors, they are reported as statuses by the operations that can observe them.
pub struct Error {
    kind: Box<Kind>,
}

#[derive(Debug)]
pub enum Kind {
    /// Request line or header grammar violation.
    Parse(ParseError),
    InvalidContentLength,
    UnsupportedTransferEncoding,
    /// Both `Transfer-Encoding` and `Content-Length` are present.
    ConflictingFraming,
    MissingHost,
    UnsupportedVersion,
    /// Malformed chunked request body.
    InvalidChunk,
    RequestHeadersTooLarge,
    ResponseHeadersTooLarge,
    /// A response header value the application set cannot be serialized.
    InvalidResponseHeader,
    /// The peer closed the connection before the request body was complete.
    UnexpectedEof,
    /// Socket failure, the connection must be closed without further protocol exchange.
    Io(io::Error),
    Misuse(Misuse),
}

/// API used in a way the current state does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Misuse {
    /// `reset` called without a valid mark.
    ResetWithoutMark,
    /// Header mutation after the response was committed.
    Committed,
    /// Byte and character access mixed on the same body.
    ModeConflict,
    /// Body written after close.
    Closed,
    /// No socket bound to the connection.
    NotBound,
}

impl Error {
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn into_kind(self) -> Kind {
        *self.kind
    }

    /// Malformed request, the client is at fault.
    pub fn is_malformed(&self) -> bool {
        matches!(
            *self.kind,
            Kind::Parse(_)
                | Kind::InvalidContentLength
                | Kind::UnsupportedTransferEncoding
                | Kind::ConflictingFraming
                | Kind::MissingHost
                | Kind::UnsupportedVersion
                | Kind::InvalidChunk
        )
    }

    /// A configured size limit was exceeded.
    pub fn is_limit(&self) -> bool {
        matches!(*self.kind, Kind::RequestHeadersTooLarge | Kind::ResponseHeadersTooLarge)
    }

    /// The connection cannot be salvaged.
    pub fn is_close_now(&self) -> bool {
        matches!(*self.kind, Kind::Io(_) | Kind::UnexpectedEof)
    }

    pub fn is_misuse(&self) -> bool {
        matches!(*self.kind, Kind::Misuse(_))
    }

    /// Status an error response for this error should carry, if one can still be sent.
    pub fn status_hint(&self) -> Option<StatusCode> {
        match *self.kind {
            Kind::Parse(_)
            | Kind::InvalidContentLength
            | Kind::ConflictingFraming
            | Kind::MissingHost
            | Kind::InvalidChunk => Some(StatusCode::BAD_REQUEST),
            Kind::UnsupportedTransferEncoding => Some(StatusCode::NOT_IMPLEMENTED),
            Kind::UnsupportedVersion => Some(StatusCode::HTTP_VERSION_NOT_SUPPORTED),
            Kind::RequestHeadersTooLarge => Some(StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE),
            Kind::ResponseHeadersTooLarge | Kind::InvalidResponseHeader | Kind::Misuse(_) => {
                Some(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Kind::UnexpectedEof | Kind::Io(_) => None,
        }
    }
}

impl From<Kind> for Error {
    #[inline]
    fn from(kind: Kind) -> Self {
        Self { kind: Box::new(kind) }
    }
}

impl From<ParseError> for Error {
    #[inline]
    fn from(v: ParseError) -> Self {
        Kind::Parse(v).into()
    }
}

impl From<Misuse> for Error {
    #[inline]
    fn from(v: Misuse) -> Self {
        Kind::Misuse(v).into()
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(v: io::Error) -> Self {
        Kind::Io(v).into()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &*self.kind {
            Kind::Parse(err) => Some(err),
            Kind::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Error").field(&self.kind).finish()
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Parse(err) => write!(f, "parse error: {err}"),
            Kind::InvalidContentLength => f.write_str("invalid content length"),
            Kind::UnsupportedTransferEncoding => f.write_str("unsupported transfer encoding"),
            Kind::ConflictingFraming => {
                f.write_str("both transfer-encoding and content-length present")
            }
            Kind::MissingHost => f.write_str("missing host header"),
            Kind::UnsupportedVersion => f.write_str("unsupported http version"),
            Kind::InvalidChunk => f.write_str("invalid chunked encoding"),
            Kind::RequestHeadersTooLarge => f.write_str("request header too large"),
            Kind::ResponseHeadersTooLarge => f.write_str("response header too large"),
            Kind::InvalidResponseHeader => f.write_str("invalid response header value"),
            Kind::UnexpectedEof => f.write_str("unexpected end of stream"),
            Kind::Io(err) => write!(f, "io error: {err}"),
            Kind::Misuse(misuse) => misuse.fmt(f),
        }
    }
}

impl fmt::Display for Misuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Misuse::ResetWithoutMark => "reset without a valid mark",
            Misuse::Committed => "response already committed",
            Misuse::ModeConflict => "byte and character access mixed on the same stream",
            Misuse::Closed => "stream already closed",
            Misuse::NotBound => "connection has no socket",
        })
    }
}
