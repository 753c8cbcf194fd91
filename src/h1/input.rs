//! Wire input stage.
use std::io;
use std::time::Duration;

use bytes::BytesMut;

use super::Parsed;
use super::buffer::WireBuffer;
use super::parser::{RequestLine, RequestParser, Start};
use crate::common::ParseResult;
use crate::config::Config;
use crate::error::{Error, Kind};
use crate::filter::BodyDecoder;
use crate::headers::HeaderMap;
use crate::log::debug;
use crate::net::{ReadStatus, SocketHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Line,
    Headers,
    Body,
}

/// Socket backed request reader.
///
/// The request head is parsed from the first `max_http_header_size` bytes of the buffer, the
/// rest of the buffer is the window body bytes are read through. Reads only happen when the
/// parser ran out of bytes, in the blocking mode the caller asked for.
#[derive(Debug)]
pub struct WireInput {
    buf: WireBuffer,
    parser: RequestParser,
    max_header: usize,
    /// End of the request head, where the body window starts.
    end: usize,
    stage: Stage,
    /// No request was read on this connection yet.
    fresh: bool,
    /// At least one request was served on this connection.
    kept_alive: bool,
    decoder: BodyDecoder,
    keep_alive_timeout: Option<Duration>,
    connection_timeout: Option<Duration>,
    timeout: Option<Option<Duration>>,
}

impl WireInput {
    pub fn new(config: &Config) -> Self {
        let max_header = config.max_http_header_size;
        Self {
            buf: WireBuffer::new(max_header + config.socket_read_buffer_size.max(1)),
            parser: RequestParser::new(
                config.path_class(),
                config.query_class(),
                config.reject_illegal_header,
            ),
            max_header,
            end: 0,
            stage: Stage::Line,
            fresh: true,
            kept_alive: false,
            decoder: BodyDecoder::Void,
            keep_alive_timeout: config.keep_alive_timeout,
            connection_timeout: config.connection_timeout,
            timeout: None,
        }
    }

    /// Parse the request line and headers.
    ///
    /// On [`Parsed::Pending`] the progress is kept, calling again after the socket became
    /// readable resumes. On a request line error, `line` still receives what could be read
    /// with the protocol set to `HTTP/1.1`.
    pub fn parse_head<S: SocketHandle>(
        &mut self,
        sock: &mut S,
        block: bool,
        line: &mut RequestLine,
        headers: &mut HeaderMap,
    ) -> Result<Parsed, Error> {
        if self.stage == Stage::Line {
            loop {
                match self.parser.parse_request_line(&mut self.buf, self.fresh) {
                    ParseResult::Ok(Start::Request(parsed)) => {
                        *line = parsed;
                        break;
                    }
                    ParseResult::Ok(Start::Http2Preface) => return Ok(Parsed::Http2Preface),
                    ParseResult::Err(err) => {
                        *line = self.parser.partial_line(&self.buf);
                        debug!("invalid request line: {err}");
                        return Err(err.into());
                    }
                    ParseResult::Pending => match self.fill(sock, block)? {
                        ReadStatus::Read(_) => {}
                        ReadStatus::WouldBlock => return Ok(Parsed::Pending),
                        ReadStatus::Eof => return self.eof_in_head(),
                    },
                }
            }
            self.fresh = false;
            self.stage = match line.protocol.is_empty() {
                true => Stage::Body,
                false => Stage::Headers,
            };
        }

        if self.stage == Stage::Headers {
            loop {
                match self.parser.parse_headers(&mut self.buf, headers) {
                    ParseResult::Ok(()) => break,
                    ParseResult::Err(err) => {
                        debug!("invalid request header: {err}");
                        return Err(err.into());
                    }
                    ParseResult::Pending => match self.fill(sock, block)? {
                        ReadStatus::Read(_) => {}
                        ReadStatus::WouldBlock => return Ok(Parsed::Pending),
                        ReadStatus::Eof => return self.eof_in_head(),
                    },
                }
            }
            if self.buf.position() > self.max_header {
                return Err(Kind::RequestHeadersTooLarge.into());
            }
            self.stage = Stage::Body;
        }

        self.end = self.buf.position();
        Ok(Parsed::Ready)
    }

    fn eof_in_head(&self) -> Result<Parsed, Error> {
        if self.stage == Stage::Line && self.parser.at_line_start() {
            Ok(Parsed::Closed)
        } else {
            Err(Kind::UnexpectedEof.into())
        }
    }

    /// Read more bytes from the socket into the buffer.
    fn fill<S: SocketHandle>(&mut self, sock: &mut S, block: bool) -> Result<ReadStatus, Error> {
        let end = if self.stage == Stage::Body {
            if !self.buf.has_remaining() {
                self.buf.truncate(self.end);
            }
            self.buf.capacity()
        } else {
            if self.buf.limit() >= self.max_header {
                return Err(Kind::RequestHeadersTooLarge.into());
            }
            self.max_header
        };

        let idle = self.kept_alive && self.stage == Stage::Line && self.parser.at_line_start();
        if block {
            let timeout = match idle {
                true => self.keep_alive_timeout,
                false => self.connection_timeout,
            };
            if self.timeout != Some(timeout) {
                sock.set_read_timeout(timeout)?;
                self.timeout = Some(timeout);
            }
        }

        let status = match sock.read(block, self.buf.spare_mut(end)) {
            Ok(status) => status,
            Err(err) if idle && is_timeout(&err) => {
                debug!("keep-alive timeout expired");
                return Ok(ReadStatus::Eof);
            }
            Err(err) => return Err(err.into()),
        };
        if let ReadStatus::Read(cnt) = status {
            self.buf.commit(cnt);
        }
        Ok(status)
    }

    // ===== Body =====

    pub fn set_decoder(&mut self, decoder: BodyDecoder) {
        self.decoder = decoder;
    }

    /// Returns `true` once the request body was read to its end.
    pub fn is_body_done(&self) -> bool {
        self.decoder.is_done()
    }

    /// Read decoded body bytes into `dst`.
    ///
    /// Returns [`ReadStatus::Eof`] at the end of the body, not at the end of the stream. The
    /// stream ending inside the body is [`Kind::UnexpectedEof`].
    pub fn read_body<S: SocketHandle>(
        &mut self,
        sock: &mut S,
        block: bool,
        dst: &mut BytesMut,
    ) -> Result<ReadStatus, Error> {
        if self.stage != Stage::Body {
            return Ok(ReadStatus::Eof);
        }
        loop {
            if self.decoder.is_done() {
                return Ok(ReadStatus::Eof);
            }
            if !self.buf.has_remaining() {
                match self.fill(sock, block)? {
                    ReadStatus::Read(_) => {}
                    ReadStatus::WouldBlock => return Ok(ReadStatus::WouldBlock),
                    ReadStatus::Eof => return Err(Kind::UnexpectedEof.into()),
                }
            }
            let before = dst.len();
            let used = self.decoder.decode(self.buf.chunk(), dst)?;
            self.buf.advance(used);
            if dst.len() > before {
                return Ok(ReadStatus::Read(dst.len() - before));
            }
        }
    }

    /// Swallow the unread part of the request body, so the next request starts at the right
    /// offset.
    pub fn end_request<S: SocketHandle>(&mut self, sock: &mut S) -> Result<(), Error> {
        let mut scratch = BytesMut::new();
        while !self.decoder.is_done() {
            scratch.clear();
            if let ReadStatus::Eof | ReadStatus::WouldBlock =
                self.read_body(sock, true, &mut scratch)?
            {
                break;
            }
        }
        Ok(())
    }

    /// Number of bytes already read past the current request.
    pub fn available(&self) -> usize {
        self.buf.remaining()
    }

    /// Prepare for the next request on the same connection, keeping pipelined bytes.
    pub fn next_request(&mut self) {
        self.buf.compact();
        self.parser.reset();
        self.stage = Stage::Line;
        self.end = 0;
        self.decoder = BodyDecoder::Void;
        self.kept_alive = true;
    }

    /// Reset for a new connection.
    pub fn recycle(&mut self) {
        self.buf.clear();
        self.parser.reset();
        self.stage = Stage::Line;
        self.end = 0;
        self.fresh = true;
        self.kept_alive = false;
        self.decoder = BodyDecoder::Void;
        self.timeout = None;
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}
