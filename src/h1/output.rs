//! Wire output stage.
use bytes::BytesMut;

use crate::error::{Error, Kind};
use crate::filter::{FilterChain, FilterId, OutputFilter, OutputSink, ResponseInfo};
use crate::headers::HeaderValue;
use crate::http::StatusCode;
use crate::net::SocketHandle;

const ACK: &[u8] = b"HTTP/1.1 100 \r\n\r\n";

/// Response head serializer and body filter chain.
///
/// The status line and headers go into a bounded buffer that is written to the socket in one
/// piece on commit. Body bytes then go through the active filters.
#[derive(Debug)]
pub struct WireOutput {
    head: BytesMut,
    max_head: usize,
    filters: FilterChain,
    committed: bool,
    ended: bool,
    /// Bytes handed to the socket for the current response, head included.
    written: u64,
}

impl WireOutput {
    pub fn new(max_head: usize) -> Self {
        Self {
            head: BytesMut::with_capacity(max_head),
            max_head,
            filters: FilterChain::new(),
            committed: false,
            ended: false,
            written: 0,
        }
    }

    // ===== Filters =====

    pub fn add_filter(&mut self, filter: Box<dyn OutputFilter>) -> FilterId {
        self.filters.add(filter)
    }

    pub fn activate(&mut self, id: FilterId, info: &ResponseInfo) -> bool {
        self.filters.activate(id, info)
    }

    #[cfg(test)]
    pub fn is_active(&self, id: FilterId) -> bool {
        self.filters.is_active(id)
    }

    // ===== Head =====

    /// Append bytes to the head, all or nothing.
    fn put(&mut self, parts: &[&[u8]]) -> Result<(), Error> {
        let len: usize = parts.iter().map(|p| p.len()).sum();
        if self.head.len() + len > self.max_head {
            return Err(Kind::ResponseHeadersTooLarge.into());
        }
        for part in parts {
            self.head.extend_from_slice(part);
        }
        Ok(())
    }

    /// `HTTP/1.1 <code> <reason>`, the reason may be empty.
    pub fn write_status(&mut self, status: StatusCode, reason: &str) -> Result<(), Error> {
        let mut code = itoa::Buffer::new();
        self.put(&[b"HTTP/1.1 ", code.format(status.as_u16()).as_bytes(), b" ", reason.as_bytes(), b"\r\n"])
    }

    /// `name: value` line, a value with control characters is rejected.
    pub fn write_header(&mut self, name: &str, value: &[u8]) -> Result<(), Error> {
        if !HeaderValue::is_valid(value) {
            return Err(Kind::InvalidResponseHeader.into());
        }
        self.put(&[name.as_bytes(), b": ", value, b"\r\n"])
    }

    pub fn end_headers(&mut self) -> Result<(), Error> {
        self.put(&[b"\r\n"])
    }

    /// The serialized head so far.
    #[cfg(test)]
    pub fn head(&self) -> &[u8] {
        &self.head
    }

    #[cfg(test)]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Write the head to the socket.
    pub fn commit<S: SocketHandle>(&mut self, sock: &mut S, block: bool) -> Result<(), Error> {
        if self.committed {
            return Ok(());
        }
        self.committed = true;
        let mut sink = SocketSink { sock, block, written: &mut self.written };
        sink.write(&self.head)?;
        self.head.clear();
        Ok(())
    }

    /// Interim `100 Continue` response.
    pub fn send_ack<S: SocketHandle>(&mut self, sock: &mut S, block: bool) -> Result<(), Error> {
        if self.committed {
            return Ok(());
        }
        sock.write(block, ACK)?;
        sock.flush(block)?;
        Ok(())
    }

    // ===== Body =====

    /// Write body bytes through the active filters.
    pub fn write<S: SocketHandle>(&mut self, sock: &mut S, block: bool, chunk: &[u8]) -> Result<(), Error> {
        if self.ended {
            return Err(crate::error::Misuse::Closed.into());
        }
        let mut sink = SocketSink { sock, block, written: &mut self.written };
        self.filters.write(chunk, &mut sink)
    }

    pub fn flush<S: SocketHandle>(&mut self, sock: &mut S, block: bool) -> Result<(), Error> {
        let mut sink = SocketSink { sock, block, written: &mut self.written };
        self.filters.flush(&mut sink)
    }

    /// Finish the response body, writing any trailing framing.
    pub fn end<S: SocketHandle>(&mut self, sock: &mut S, block: bool) -> Result<(), Error> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;
        let mut sink = SocketSink { sock, block, written: &mut self.written };
        self.filters.end(&mut sink)
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Discard the head and deactivate filters, for the next response.
    pub fn recycle(&mut self) {
        self.head.clear();
        self.filters.recycle();
        self.committed = false;
        self.ended = false;
        self.written = 0;
    }
}

/// Bottom of the filter chain.
struct SocketSink<'a, S> {
    sock: &'a mut S,
    block: bool,
    written: &'a mut u64,
}

impl<S: SocketHandle> OutputSink for SocketSink<'_, S> {
    fn write(&mut self, chunk: &[u8]) -> Result<(), Error> {
        self.sock.write(self.block, chunk)?;
        *self.written += chunk.len() as u64;
        if !self.block && self.sock.has_data_to_write() {
            self.sock.register_write_interest();
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        if !self.sock.flush(self.block)? {
            self.sock.register_write_interest();
        }
        Ok(())
    }

    fn end(&mut self) -> Result<(), Error> {
        self.flush()
    }
}
