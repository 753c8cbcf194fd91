//! Resumable request line and header parser.
//!
//! The parser owns no bytes. It walks a [`WireBuffer`] and remembers where it stopped, so a
//! call that returns [`ParseResult::Pending`] can be repeated once more bytes were read into
//! the same buffer, in any fragmentation.
use super::buffer::WireBuffer;
use crate::common::ParseResult;
use crate::headers::{HeaderMap, HeaderName, HeaderValue};
use crate::log::{debug, printable};
use crate::matches::{self, ByteClass};

mod error;

pub use error::ParseError;

/// Client preface of a prior knowledge HTTP/2 connection.
pub const HTTP2_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// A parsed request line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    /// Path part of the target, without the query.
    pub uri: String,
    /// Everything after the first `?`.
    pub query: Option<String>,
    /// Protocol token, empty for HTTP/0.9.
    pub protocol: String,
}

/// Outcome of the request line phase.
#[derive(Debug, PartialEq, Eq)]
pub enum Start {
    Request(RequestLine),
    /// The connection opened with the HTTP/2 client preface.
    Http2Preface,
}

/// Request line phases, only ever advanced forward within one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    SkipBlank,
    Method,
    SpaceBeforeTarget,
    Target,
    TargetCr,
    SpaceBeforeProtocol,
    Protocol,
    ProtocolCr,
}

/// Header line states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderState {
    Start,
    StartCr,
    Name,
    ValueStart,
    Value,
    MultiLine,
    SkipLine,
}

/// Offsets of the header line being parsed.
///
/// The value is compacted in place while it is read: `real_pos` is where the next value byte
/// is written back, `last_significant` is one past the last non whitespace byte written.
#[derive(Debug, Default, Clone, Copy)]
struct HeaderLineRecord {
    line_start: usize,
    name_start: usize,
    name_end: Option<usize>,
    value_start: usize,
    real_pos: usize,
    last_significant: usize,
}

/// Result of parsing one header line.
enum Line {
    Field,
    Skipped,
    End,
}

#[derive(Debug)]
pub struct RequestParser {
    phase: Phase,
    line_start: usize,
    method_end: usize,
    target_start: usize,
    target_end: usize,
    query_start: Option<usize>,
    protocol_start: usize,
    protocol_end: usize,

    state: HeaderState,
    record: HeaderLineRecord,
    prev: u8,

    path: ByteClass,
    query: ByteClass,
    reject_illegal_header: bool,
}

impl RequestParser {
    pub fn new(path: ByteClass, query: ByteClass, reject_illegal_header: bool) -> Self {
        Self {
            phase: Phase::SkipBlank,
            line_start: 0,
            method_end: 0,
            target_start: 0,
            target_end: 0,
            query_start: None,
            protocol_start: 0,
            protocol_end: 0,
            state: HeaderState::Start,
            record: HeaderLineRecord::default(),
            prev: 0,
            path,
            query,
            reject_illegal_header,
        }
    }

    /// Returns `true` if no byte of a request line was consumed yet, blank lines aside.
    pub fn at_line_start(&self) -> bool {
        self.phase == Phase::SkipBlank
    }

    /// Forget any progress, for the next request.
    pub fn reset(&mut self) {
        self.phase = Phase::SkipBlank;
        self.query_start = None;
        self.state = HeaderState::Start;
        self.record = HeaderLineRecord::default();
        self.prev = 0;
    }

    // ===== Request Line =====

    /// Parse the request line.
    ///
    /// `fresh` allows detection of the HTTP/2 preface, it must only be set for the first
    /// request of a connection.
    pub fn parse_request_line(
        &mut self,
        buf: &mut WireBuffer,
        fresh: bool,
    ) -> ParseResult<Start, ParseError> {
        while let Some(byte) = buf.peek() {
            let pos = buf.position();
            match self.phase {
                Phase::SkipBlank => {
                    if byte == CR || byte == LF {
                        buf.advance(1);
                        continue;
                    }
                    if fresh && pos == 0 && byte == HTTP2_PREFACE[0] {
                        let chunk = buf.chunk();
                        let len = chunk.len().min(HTTP2_PREFACE.len());
                        if chunk[..len] == HTTP2_PREFACE[..len] {
                            if len < HTTP2_PREFACE.len() {
                                return ParseResult::Pending;
                            }
                            buf.advance(len);
                            debug!("http/2 connection preface received");
                            return ParseResult::Ok(Start::Http2Preface);
                        }
                    }
                    self.line_start = pos;
                    self.query_start = None;
                    self.phase = Phase::Method;
                }
                Phase::Method => {
                    if (byte == b' ' || byte == b'\t') && pos > self.line_start {
                        self.method_end = pos;
                        self.phase = Phase::SpaceBeforeTarget;
                    } else if !matches::is_token(byte) {
                        return ParseResult::Err(ParseError::InvalidMethod);
                    }
                    buf.advance(1);
                }
                Phase::SpaceBeforeTarget => {
                    if byte == b' ' || byte == b'\t' {
                        buf.advance(1);
                    } else {
                        self.target_start = pos;
                        self.phase = Phase::Target;
                    }
                }
                Phase::Target => match byte {
                    b' ' | b'\t' => {
                        self.target_end = pos;
                        if self.target_end == self.target_start {
                            return ParseResult::Err(ParseError::InvalidTarget);
                        }
                        buf.advance(1);
                        self.phase = Phase::SpaceBeforeProtocol;
                    }
                    CR | LF => {
                        // no protocol token, HTTP/0.9
                        self.target_end = pos;
                        if self.target_end == self.target_start {
                            return ParseResult::Err(ParseError::InvalidTarget);
                        }
                        self.protocol_start = pos;
                        self.protocol_end = pos;
                        buf.advance(1);
                        if byte == LF {
                            return ParseResult::Ok(Start::Request(self.finish_line(buf)));
                        }
                        self.phase = Phase::TargetCr;
                    }
                    b'?' if self.query_start.is_none() => {
                        self.query_start = Some(pos);
                        buf.advance(1);
                    }
                    _ => {
                        let class = match self.query_start {
                            Some(_) => &self.query,
                            None => &self.path,
                        };
                        if !class.contains(byte) {
                            return ParseResult::Err(ParseError::InvalidTarget);
                        }
                        buf.advance(1);
                    }
                },
                Phase::TargetCr | Phase::ProtocolCr => {
                    if byte != LF {
                        return ParseResult::Err(ParseError::InvalidSeparator);
                    }
                    buf.advance(1);
                    return ParseResult::Ok(Start::Request(self.finish_line(buf)));
                }
                Phase::SpaceBeforeProtocol => {
                    if byte == b' ' || byte == b'\t' {
                        buf.advance(1);
                    } else {
                        self.protocol_start = pos;
                        self.phase = Phase::Protocol;
                    }
                }
                Phase::Protocol => match byte {
                    CR | LF => {
                        self.protocol_end = pos;
                        buf.advance(1);
                        if byte == LF {
                            return ParseResult::Ok(Start::Request(self.finish_line(buf)));
                        }
                        self.phase = Phase::ProtocolCr;
                    }
                    _ if matches::is_http_protocol(byte) => buf.advance(1),
                    _ => return ParseResult::Err(ParseError::InvalidProtocol),
                },
            }
        }
        ParseResult::Pending
    }

    fn finish_line(&mut self, buf: &WireBuffer) -> RequestLine {
        self.phase = Phase::SkipBlank;
        let (uri_end, query) = match self.query_start {
            Some(q) => (q, Some(ascii(buf.slice(q + 1..self.target_end)))),
            None => (self.target_end, None),
        };
        RequestLine {
            method: ascii(buf.slice(self.line_start..self.method_end)),
            uri: ascii(buf.slice(self.target_start..uri_end)),
            query,
            protocol: ascii(buf.slice(self.protocol_start..self.protocol_end)),
        }
    }

    /// Whatever part of the request line was read before a failure.
    ///
    /// The protocol is always `HTTP/1.1`, so an error response can be written.
    pub fn partial_line(&self, buf: &WireBuffer) -> RequestLine {
        let mut line = RequestLine { protocol: "HTTP/1.1".into(), ..RequestLine::default() };
        if self.phase > Phase::Method {
            line.method = ascii(buf.slice(self.line_start..self.method_end));
        }
        if self.phase >= Phase::Target {
            let end = match self.phase {
                Phase::Target => buf.position(),
                _ => self.target_end,
            };
            let uri_end = self.query_start.unwrap_or(end).min(end);
            line.uri = ascii(buf.slice(self.target_start..uri_end));
        }
        line
    }

    // ===== Headers =====

    /// Parse header lines into `headers` until the empty line.
    pub fn parse_headers(
        &mut self,
        buf: &mut WireBuffer,
        headers: &mut HeaderMap,
    ) -> ParseResult<(), ParseError> {
        loop {
            match self.parse_header(buf, headers) {
                ParseResult::Ok(Line::End) => return ParseResult::Ok(()),
                ParseResult::Ok(Line::Field | Line::Skipped) => {}
                ParseResult::Pending => return ParseResult::Pending,
                ParseResult::Err(err) => return ParseResult::Err(err),
            }
        }
    }

    fn parse_header(
        &mut self,
        buf: &mut WireBuffer,
        headers: &mut HeaderMap,
    ) -> ParseResult<Line, ParseError> {
        while let Some(byte) = buf.peek() {
            let pos = buf.position();
            match self.state {
                HeaderState::Start => match byte {
                    LF => {
                        buf.advance(1);
                        return ParseResult::Ok(Line::End);
                    }
                    CR => {
                        buf.advance(1);
                        self.state = HeaderState::StartCr;
                    }
                    _ => {
                        self.record = HeaderLineRecord {
                            line_start: pos,
                            name_start: pos,
                            ..HeaderLineRecord::default()
                        };
                        self.prev = 0;
                        self.state = HeaderState::Name;
                    }
                },
                HeaderState::StartCr => {
                    if byte != LF {
                        return ParseResult::Err(ParseError::InvalidSeparator);
                    }
                    buf.advance(1);
                    self.state = HeaderState::Start;
                    return ParseResult::Ok(Line::End);
                }
                HeaderState::Name => {
                    if byte == b':' && pos > self.record.name_start {
                        self.record.name_end = Some(pos);
                        buf.advance(1);
                        self.record.value_start = buf.position();
                        self.record.real_pos = buf.position();
                        self.record.last_significant = buf.position();
                        self.state = HeaderState::ValueStart;
                    } else if matches::is_token(byte) {
                        buf.set(pos, byte.to_ascii_lowercase());
                        buf.advance(1);
                    } else {
                        self.state = HeaderState::SkipLine;
                    }
                }
                HeaderState::ValueStart => {
                    if byte == b' ' || byte == b'\t' {
                        buf.advance(1);
                    } else {
                        self.state = HeaderState::Value;
                    }
                }
                HeaderState::Value => {
                    if self.prev == CR && byte != LF {
                        self.state = HeaderState::SkipLine;
                        continue;
                    }
                    match byte {
                        CR => {}
                        LF => self.state = HeaderState::MultiLine,
                        b' ' | b'\t' => self.put_value_byte(buf, byte, false),
                        _ if matches::is_control(byte) => {
                            self.state = HeaderState::SkipLine;
                            continue;
                        }
                        _ => self.put_value_byte(buf, byte, true),
                    }
                    self.prev = byte;
                    buf.advance(1);
                }
                HeaderState::MultiLine => {
                    if byte == b' ' || byte == b'\t' {
                        // continuation line, folded to a single space
                        self.record.real_pos = self.record.last_significant;
                        if self.record.real_pos > self.record.value_start {
                            self.put_value_byte(buf, b' ', false);
                        }
                        self.prev = 0;
                        self.state = HeaderState::ValueStart;
                        buf.advance(1);
                    } else {
                        self.state = HeaderState::Start;
                        return self.commit_field(buf, headers);
                    }
                }
                HeaderState::SkipLine => {
                    buf.advance(1);
                    if byte == LF {
                        self.state = HeaderState::Start;
                        return self.skip_line(buf);
                    }
                }
            }
        }
        ParseResult::Pending
    }

    fn put_value_byte(&mut self, buf: &mut WireBuffer, byte: u8, significant: bool) {
        buf.set(self.record.real_pos, byte);
        self.record.real_pos += 1;
        if significant {
            self.record.last_significant = self.record.real_pos;
        }
    }

    fn commit_field(
        &mut self,
        buf: &WireBuffer,
        headers: &mut HeaderMap,
    ) -> ParseResult<Line, ParseError> {
        let record = self.record;
        let Some(name_end) = record.name_end else {
            return self.skip_line(buf);
        };
        let name = buf.slice(record.name_start..name_end);
        let value = buf.slice(record.value_start..record.last_significant);
        match HeaderName::from_slice(name) {
            Ok(name) => {
                headers.append(name, HeaderValue::from_parsed(value));
                ParseResult::Ok(Line::Field)
            }
            Err(_) => self.skip_line(buf),
        }
    }

    fn skip_line(&mut self, buf: &WireBuffer) -> ParseResult<Line, ParseError> {
        let record = self.record;
        let line = printable(buf.slice(record.line_start..buf.position()).trim_ascii_end());
        let is_host = record
            .name_end
            .is_some_and(|end| buf.slice(record.name_start..end) == b"host");

        if self.reject_illegal_header || is_host {
            return ParseResult::Err(ParseError::InvalidHeader(line));
        }
        debug!("skipping invalid header line [{line}]");
        ParseResult::Ok(Line::Skipped)
    }
}

/// Request line bytes are restricted to visible ASCII, others render as ISO-8859-1.
fn ascii(bytes: &[u8]) -> String {
    crate::charset::latin1(bytes)
}
