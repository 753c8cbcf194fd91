/// Request line or header grammar violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Non token byte in the method.
    InvalidMethod,
    /// Empty request target, or a byte not allowed in the path or query.
    InvalidTarget,
    /// Byte not allowed in the protocol token.
    InvalidProtocol,
    /// A carriage return not followed by a line feed.
    InvalidSeparator,
    /// Malformed header line, rendered printable.
    InvalidHeader(String),
}

impl std::error::Error for ParseError {}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::InvalidMethod => f.write_str("invalid character found in method name"),
            Self::InvalidTarget => f.write_str("invalid character found in the request target"),
            Self::InvalidProtocol => f.write_str("invalid character found in the HTTP protocol"),
            Self::InvalidSeparator => f.write_str("carriage return not followed by line feed"),
            Self::InvalidHeader(line) => write!(f, "invalid header line [{line}]"),
        }
    }
}
