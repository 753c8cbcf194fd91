use std::io;
use std::mem;
use std::sync::Arc;

use bytes::BytesMut;

use super::Parsed;
use super::input::WireInput;
use super::output::WireOutput;
use super::parser::RequestLine;
use crate::app::{BodySource, InputAdapter, OutputAdapter, ReadLine, ResponseSink};
use crate::charset::{Charset, ConverterPool};
use crate::config::Config;
use crate::error::{Error, Kind, Misuse};
use crate::filter::{
    BodyDecoder, ChunkedFilter, FilterId, IdentityFilter, OutputFilter, ResponseInfo, VoidFilter,
};
use crate::headers::standard::{CONNECTION, CONTENT_LENGTH, EXPECT, HOST, TRANSFER_ENCODING};
use crate::http::{StatusCode, Version};
use crate::log::debug;
use crate::net::{ReadStatus, SocketHandle};
use crate::request::Request;
use crate::response::Response;

/// Transfer coding filters, registered once per connection.
#[derive(Debug)]
struct Transfer {
    identity: FilterId,
    chunked: FilterId,
    void: FilterId,
}

/// An HTTP/1.1 server connection.
///
/// One `Connection` is reused for every request of a socket, and for every socket it is
/// [`init`]ed with. Between two requests [`next_request`] must be called, between two sockets
/// [`recycle`], otherwise state of the previous request leaks into the next one.
///
/// [`init`]: Connection::init
/// [`next_request`]: Connection::next_request
/// [`recycle`]: Connection::recycle
#[derive(Debug)]
pub struct Connection<S> {
    config: Arc<Config>,
    socket: Option<S>,
    block: bool,

    input: WireInput,
    output: WireOutput,
    transfer: Transfer,
    body_in: InputAdapter,
    body_out: OutputAdapter,

    line: RequestLine,
    request: Request,
    response: Response,

    keep_alive: bool,
    /// Requests parsed on the current socket.
    served: usize,
    /// `100 Continue` owed before the body is read.
    ack_pending: bool,
}

impl<S: SocketHandle> Connection<S> {
    pub fn new(config: Arc<Config>, pool: Arc<ConverterPool>) -> Self {
        let mut output = WireOutput::new(config.max_response_header_size);
        let transfer = Transfer {
            identity: output.add_filter(Box::<IdentityFilter>::default()),
            chunked: output.add_filter(Box::<ChunkedFilter>::default()),
            void: output.add_filter(Box::<VoidFilter>::default()),
        };
        Self {
            input: WireInput::new(&config),
            output,
            transfer,
            body_in: InputAdapter::new(&config, pool.clone()),
            body_out: OutputAdapter::new(config.output_buffer_size, pool),
            socket: None,
            block: true,
            line: RequestLine::default(),
            request: Request::default(),
            response: Response::default(),
            keep_alive: true,
            served: 0,
            ack_pending: false,
            config,
        }
    }

    /// Bind the connection to a socket, forgetting the previous one.
    pub fn init(&mut self, socket: S) {
        self.recycle();
        self.socket = Some(socket);
    }

    #[inline]
    pub fn socket(&self) -> Option<&S> {
        self.socket.as_ref()
    }

    #[inline]
    pub fn socket_mut(&mut self) -> Option<&mut S> {
        self.socket.as_mut()
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register a filter that responses may activate with [`Response::add_filter`].
    pub fn register_filter(&mut self, filter: Box<dyn OutputFilter>) -> FilterId {
        self.output.add_filter(filter)
    }

    // ===== Request =====

    /// Read the next request head.
    ///
    /// On error the request still carries what could be parsed, with its protocol forced to
    /// `HTTP/1.1`, and keep-alive is off. Unless the error [closes the connection
    /// now](Error::is_close_now), an error response can be sent with [`send_error`].
    ///
    /// [`send_error`]: Connection::send_error
    pub fn parse_request(&mut self, block: bool) -> Result<Parsed, Error> {
        let sock = self.socket.as_mut().ok_or(Misuse::NotBound)?;
        self.block = block;

        let parsed = match self.input.parse_head(sock, block, &mut self.line, self.request.headers_mut()) {
            Ok(Parsed::Ready) => {
                self.request.set_line(mem::take(&mut self.line));
                self.prepare_request().map(|()| Parsed::Ready)
            }
            other => other,
        };

        match parsed {
            Ok(Parsed::Http2Preface) => {
                debug!("http/2 connection preface received");
                self.keep_alive = false;
                Ok(Parsed::Http2Preface)
            }
            Ok(parsed) => Ok(parsed),
            Err(err) => {
                if !self.line.method.is_empty() {
                    self.request.set_line(mem::take(&mut self.line));
                }
                self.request.force_http11();
                self.keep_alive = false;
                Err(err)
            }
        }
    }

    /// Derive protocol, keep-alive and body framing from the request head.
    fn prepare_request(&mut self) -> Result<(), Error> {
        let version = Version::from_protocol(self.request.protocol())
            .filter(|version| *version != Version::HTTP_2)
            .ok_or(Kind::UnsupportedVersion)?;
        self.request.set_version(Some(version));
        self.served += 1;

        let headers = self.request.headers();
        let mut keep_alive = version.is_keep_alive_default();
        for element in headers.get_all(CONNECTION).flat_map(|value| value.elements()) {
            if element.eq_ignore_ascii_case(b"close") {
                keep_alive = false;
            } else if element.eq_ignore_ascii_case(b"keep-alive") && version == Version::HTTP_10 {
                keep_alive = true;
            }
        }
        if self.config.max_keep_alive_requests.is_some_and(|max| self.served >= max) {
            keep_alive = false;
        }
        self.keep_alive = keep_alive && version != Version::HTTP_09;

        if version == Version::HTTP_11 && !headers.contains_key(HOST) {
            return Err(Kind::MissingHost.into());
        }

        let expect = version == Version::HTTP_11
            && headers.get(EXPECT).is_some_and(|value| value.eq_ignore_ascii_case("100-continue"));

        let decoder = match version == Version::HTTP_09 {
            true => BodyDecoder::Void,
            false => BodyDecoder::from_headers(headers)?,
        };
        let content_length = match &decoder {
            BodyDecoder::Identity(len) => Some(*len),
            BodyDecoder::Void if headers.contains_key(CONTENT_LENGTH) => Some(0),
            _ => None,
        };

        self.request.set_content_length(content_length);
        self.request.set_expect_continue(expect);
        self.ack_pending = expect;
        self.input.set_decoder(decoder);
        self.body_in
            .set_charset(self.request.charset().unwrap_or(self.config.default_request_charset));
        Ok(())
    }

    #[inline]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The request body.
    pub fn body(&mut self) -> Result<Body<'_, S>, Error> {
        let sock = self.socket.as_mut().ok_or(Misuse::NotBound)?;
        Ok(Body {
            adapter: &mut self.body_in,
            source: WireBody {
                sock,
                block: self.block,
                input: &mut self.input,
                output: &mut self.output,
                ack_pending: &mut self.ack_pending,
            },
        })
    }

    // ===== Response =====

    #[inline]
    pub fn response(&self) -> &Response {
        &self.response
    }

    #[inline]
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// The response body.
    pub fn writer(&mut self) -> Result<Writer<'_, S>, Error> {
        let (adapter, sink) = self.split()?;
        Ok(Writer { adapter, sink })
    }

    fn split(&mut self) -> Result<(&mut OutputAdapter, WireSink<'_, S>), Error> {
        let sock = self.socket.as_mut().ok_or(Misuse::NotBound)?;
        let sink = WireSink {
            sock,
            block: self.block,
            output: &mut self.output,
            transfer: &self.transfer,
            request: &self.request,
            response: &mut self.response,
            config: &self.config,
            keep_alive: &mut self.keep_alive,
            body_withheld: self.ack_pending && !self.input.is_body_done(),
        };
        Ok((&mut self.body_out, sink))
    }

    /// Write the response head, after which headers can no longer change.
    pub fn commit(&mut self) -> Result<(), Error> {
        self.split()?.1.commit()
    }

    /// Complete the exchange.
    ///
    /// Buffered body bytes are written, the response body is ended, and on a kept-alive
    /// connection the unread request body is swallowed.
    pub fn finish(&mut self) -> Result<(), Error> {
        let (adapter, mut sink) = self.split()?;
        adapter.close(&mut sink)?;

        if self.keep_alive {
            let sock = self.socket.as_mut().ok_or(Misuse::NotBound)?;
            if let Err(err) = self.input.end_request(sock) {
                self.keep_alive = false;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Replace the response with an empty one carrying `status`, then finish it.
    ///
    /// Keep-alive is turned off. Nothing can be replaced once the response was committed, it is
    /// only finished.
    pub fn send_error(&mut self, status: StatusCode) -> Result<(), Error> {
        self.keep_alive = false;
        if !self.response.is_committed() {
            self.response.recycle();
            self.body_out.reset_buffer();
            self.output.recycle();
            self.response.set_status(status)?;
            self.response.set_content_length(Some(0))?;
        }
        self.finish()
    }

    /// Bytes written to the socket for the current response, head included.
    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.output.bytes_written()
    }

    /// Returns `true` if another request may be read after this one.
    #[inline]
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    // ===== Lifecycle =====

    /// Prepare for the next request on the same socket.
    pub fn next_request(&mut self) {
        self.input.next_request();
        self.reset_exchange();
        self.keep_alive = true;
    }

    fn reset_exchange(&mut self) {
        self.output.recycle();
        self.body_in.recycle();
        self.body_out.recycle();
        self.line = RequestLine::default();
        self.request.recycle();
        self.response.recycle();
        self.ack_pending = false;
    }

    /// Reset everything and drop the socket.
    pub fn recycle(&mut self) {
        self.input.recycle();
        self.reset_exchange();
        self.socket = None;
        self.block = true;
        self.keep_alive = true;
        self.served = 0;
    }

    /// Take the socket back, e.g. to hand it to an HTTP/2 implementation.
    pub fn release(&mut self) -> Option<S> {
        self.socket.take()
    }
}

// ===== Body =====

/// Request body of a [`Connection`].
///
/// The body is read either as bytes or as characters, decoded with the charset of the request
/// `Content-Type` or the configured default.
#[derive(Debug)]
pub struct Body<'a, S> {
    adapter: &'a mut InputAdapter,
    source: WireBody<'a, S>,
}

impl<S: SocketHandle> Body<'_, S> {
    pub fn read(&mut self, buf: &mut [u8]) -> Result<ReadStatus, Error> {
        self.adapter.read(&mut self.source, buf)
    }

    /// Append at most `max` characters to `dst`.
    pub fn read_chars(&mut self, dst: &mut String, max: usize) -> Result<ReadStatus, Error> {
        self.adapter.read_chars(&mut self.source, dst, max)
    }

    pub fn read_line(&mut self) -> Result<ReadLine, Error> {
        self.adapter.read_line(&mut self.source)
    }

    /// Read the rest of the body as text.
    pub fn read_to_string(&mut self, dst: &mut String) -> Result<ReadStatus, Error> {
        loop {
            match self.read_chars(dst, usize::MAX)? {
                ReadStatus::Read(_) => {}
                status => return Ok(status),
            }
        }
    }

    pub fn mark(&mut self, read_ahead: usize) {
        self.adapter.mark(read_ahead);
    }

    pub fn reset(&mut self) -> Result<(), Error> {
        self.adapter.reset()
    }

    /// Items readable without touching the socket.
    pub fn available(&self) -> usize {
        self.adapter.available()
    }

    pub fn charset(&self) -> Charset {
        self.adapter.charset()
    }
}

impl<S: SocketHandle> io::Read for Body<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match Body::read(self, buf).map_err(into_io)? {
            ReadStatus::Read(cnt) => Ok(cnt),
            ReadStatus::Eof => Ok(0),
            ReadStatus::WouldBlock => Err(io::ErrorKind::WouldBlock.into()),
        }
    }
}

#[derive(Debug)]
struct WireBody<'a, S> {
    sock: &'a mut S,
    block: bool,
    input: &'a mut WireInput,
    output: &'a mut WireOutput,
    ack_pending: &'a mut bool,
}

impl<S: SocketHandle> BodySource for WireBody<'_, S> {
    fn read_body(&mut self, dst: &mut BytesMut) -> Result<ReadStatus, Error> {
        if mem::take(self.ack_pending) {
            self.output.send_ack(self.sock, self.block)?;
        }
        self.input.read_body(self.sock, self.block, dst)
    }
}

// ===== Writer =====

/// Response body of a [`Connection`].
///
/// Bytes and characters are buffered, the head is written on the first flush or when the
/// buffer fills, which commits the response.
#[derive(Debug)]
pub struct Writer<'a, S> {
    adapter: &'a mut OutputAdapter,
    sink: WireSink<'a, S>,
}

impl<S: SocketHandle> Writer<'_, S> {
    pub fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        self.adapter.write_bytes(&mut self.sink, data)
    }

    /// Write text, encoded with the response charset.
    pub fn write_str(&mut self, s: &str) -> Result<(), Error> {
        self.sink.response.set_writer_used();
        self.adapter.write_str(&mut self.sink, s)
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.adapter.flush(&mut self.sink)
    }

    /// Write what is buffered and end the body.
    pub fn close(&mut self) -> Result<(), Error> {
        self.adapter.close(&mut self.sink)
    }

    pub fn is_closed(&self) -> bool {
        self.adapter.is_closed()
    }

    /// Change the buffer size, only allowed while nothing is buffered.
    pub fn set_buffer_size(&mut self, size: usize) -> Result<(), Error> {
        self.adapter.set_buffer_size(size)
    }
}

impl<S: SocketHandle> io::Write for Writer<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Writer::write(self, buf).map_err(into_io)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Writer::flush(self).map_err(into_io)
    }
}

fn into_io(err: Error) -> io::Error {
    match err.into_kind() {
        Kind::Io(err) => err,
        kind => io::Error::other(Error::from(kind)),
    }
}

#[derive(Debug)]
struct WireSink<'a, S> {
    sock: &'a mut S,
    block: bool,
    output: &'a mut WireOutput,
    transfer: &'a Transfer,
    request: &'a Request,
    response: &'a mut Response,
    config: &'a Config,
    keep_alive: &'a mut bool,
    /// The client still waits for `100 Continue` before sending the body.
    body_withheld: bool,
}

impl<S: SocketHandle> WireSink<'_, S> {
    /// Serialize the response head and activate the filters it selects.
    fn prepare(&mut self) -> Result<(), Error> {
        let res = &*self.response;
        let version = self.request.version().unwrap_or(Version::HTTP_11);
        let head = self.request.method().is_head();
        let info = ResponseInfo { content_length: res.content_length(), head };

        // the body never comes, so it cannot be swallowed
        if self.body_withheld {
            *self.keep_alive = false;
        }

        // no head at all
        if version == Version::HTTP_09 {
            *self.keep_alive = false;
            self.output.activate(self.transfer.identity, &info);
            return Ok(());
        }

        let status = res.status();
        let reason = match (self.config.send_reason_phrase, res.message()) {
            (false, _) => "",
            (true, Some(message)) => message,
            (true, None) => status.reason().unwrap_or(""),
        };
        self.output.write_status(status, reason)?;

        let mut buf = itoa::Buffer::new();
        if status.forbids_body() {
            self.output.activate(self.transfer.void, &info);
        } else if let Some(len) = res.content_length() {
            self.output.write_header("Content-Length", buf.format(len).as_bytes())?;
            let filter = if head { self.transfer.void } else { self.transfer.identity };
            self.output.activate(filter, &info);
        } else if head {
            self.output.activate(self.transfer.void, &info);
        } else if version == Version::HTTP_11 {
            self.output.write_header("Transfer-Encoding", b"chunked")?;
            self.output.activate(self.transfer.chunked, &info);
        } else {
            // the body ends with the connection
            *self.keep_alive = false;
        }

        if let Some(content_type) = res.content_type_header(self.config.default_response_charset) {
            self.output.write_header("Content-Type", content_type.as_bytes())?;
        }

        let close_requested = res
            .headers()
            .get_all(CONNECTION)
            .flat_map(|value| value.elements())
            .any(|element| element.eq_ignore_ascii_case(b"close"));
        if close_requested {
            *self.keep_alive = false;
        }
        if !*self.keep_alive {
            self.output.write_header("Connection", b"close")?;
        } else if version == Version::HTTP_10 {
            self.output.write_header("Connection", b"keep-alive")?;
        }

        if let Some(server) = &self.config.server_header {
            self.output.write_header("Server", server.as_bytes())?;
        }
        for (name, value) in res.headers() {
            // framing is decided above
            if *name != CONNECTION && *name != TRANSFER_ENCODING {
                self.output.write_header(name.as_str(), value.as_bytes())?;
            }
        }
        self.output.end_headers()?;

        for &id in res.filters() {
            self.output.activate(id, &info);
        }
        Ok(())
    }
}

impl<S: SocketHandle> ResponseSink for WireSink<'_, S> {
    fn is_committed(&self) -> bool {
        self.response.is_committed()
    }

    fn commit(&mut self) -> Result<(), Error> {
        if self.response.is_committed() {
            return Ok(());
        }
        if let Err(err) = self.prepare() {
            // nothing reached the socket, the response may still be replaced
            self.output.recycle();
            return Err(err);
        }
        self.response.set_committed();
        self.output.commit(self.sock, self.block)
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), Error> {
        self.commit()?;
        self.output.write(self.sock, self.block, chunk)
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.commit()?;
        self.output.flush(self.sock, self.block)
    }

    fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    fn set_content_length(&mut self, len: u64) -> Result<(), Error> {
        self.response.set_content_length(Some(len))
    }

    fn is_head(&self) -> bool {
        self.request.method().is_head()
    }

    fn charset(&self) -> Charset {
        self.response.charset().unwrap_or(self.config.default_response_charset)
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.commit()?;
        self.output.end(self.sock, self.block)
    }
}
