use std::sync::Arc;

use bytes::BytesMut;

use super::{Mode, ResponseSink};
use crate::charset::{ConverterPool, Encoder};
use crate::error::{Error, Misuse};

/// Smallest buffer that holds any encoded character.
const MIN_BUFFER: usize = 4;

/// Response body as bytes or characters, batched before reaching the wire.
#[derive(Debug)]
pub struct OutputAdapter {
    mode: Mode,
    buf: BytesMut,
    size: usize,
    default_size: usize,
    encoder: Option<Encoder>,
    pool: Arc<ConverterPool>,
    closed: bool,
}

impl OutputAdapter {
    pub fn new(size: usize, pool: Arc<ConverterPool>) -> Self {
        let size = size.max(MIN_BUFFER);
        Self {
            mode: Mode::Uninit,
            buf: BytesMut::with_capacity(size),
            size,
            default_size: size,
            encoder: None,
            pool,
            closed: false,
        }
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes waiting in the buffer.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.size
    }

    /// Change the buffer size, only allowed before any body was buffered.
    pub fn set_buffer_size(&mut self, size: usize) -> Result<(), Error> {
        if !self.buf.is_empty() {
            return Err(Misuse::Committed.into());
        }
        self.size = size.max(MIN_BUFFER);
        self.buf.reserve(self.size);
        Ok(())
    }

    pub fn write_bytes<S: ResponseSink + ?Sized>(&mut self, sink: &mut S, data: &[u8]) -> Result<(), Error> {
        self.mode.fix(Mode::Bytes)?;
        if self.closed {
            return Err(Misuse::Closed.into());
        }
        if self.buf.len() + data.len() <= self.size {
            self.buf.extend_from_slice(data);
            return Ok(());
        }

        flush_buffer(&mut self.buf, sink)?;
        if data.len() >= self.size {
            sink.write(data)
        } else {
            self.buf.extend_from_slice(data);
            Ok(())
        }
    }

    /// Encode `s` with the response charset.
    ///
    /// When the next character does not fit in the remaining buffer, the buffer is flushed
    /// first so an encoded character is never split across two writes.
    pub fn write_str<S: ResponseSink + ?Sized>(&mut self, sink: &mut S, s: &str) -> Result<(), Error> {
        self.mode.fix(Mode::Chars)?;
        if self.closed {
            return Err(Misuse::Closed.into());
        }
        let charset = sink.charset();
        let mut encoder = match self.encoder.take() {
            Some(encoder) if encoder.charset() == charset => encoder,
            Some(stale) => {
                self.pool.put_encoder(stale);
                self.pool.take_encoder(charset)
            }
            None => self.pool.take_encoder(charset),
        };

        let mut rest = s;
        let result = loop {
            let room = self.size.saturating_sub(self.buf.len());
            let used = encoder.encode(rest, &mut self.buf, room);
            rest = &rest[used..];
            if rest.is_empty() {
                break Ok(());
            }
            if let Err(err) = flush_buffer(&mut self.buf, sink) {
                break Err(err);
            }
        };

        self.encoder = Some(encoder);
        result
    }

    /// Write buffered bytes and flush the socket.
    pub fn flush<S: ResponseSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), Error> {
        if self.closed {
            return Ok(());
        }
        flush_buffer(&mut self.buf, sink)?;
        sink.flush()
    }

    /// Write what is left and end the response body.
    ///
    /// A response still uncommitted at this point is entirely buffered, so without an explicit
    /// length its content length is the buffered length.
    pub fn close<S: ResponseSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), Error> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if !sink.is_committed() && sink.content_length().is_none() && !sink.is_head() {
            sink.set_content_length(self.buf.len() as u64)?;
        }
        flush_buffer(&mut self.buf, sink)?;
        sink.finish()
    }

    /// Drop buffered bytes, for an error response replacing the current one.
    pub fn reset_buffer(&mut self) {
        self.buf.clear();
        self.mode = Mode::Uninit;
    }

    pub fn recycle(&mut self) {
        self.mode = Mode::Uninit;
        self.buf.clear();
        self.closed = false;
        self.size = self.default_size;
        if self.buf.capacity() > self.default_size * 4 {
            self.buf = BytesMut::with_capacity(self.default_size);
        }
        if let Some(encoder) = self.encoder.take() {
            self.pool.put_encoder(encoder);
        }
    }
}

fn flush_buffer<S: ResponseSink + ?Sized>(buf: &mut BytesMut, sink: &mut S) -> Result<(), Error> {
    if buf.is_empty() {
        if !sink.is_committed() {
            sink.commit()?;
        }
        return Ok(());
    }
    sink.write(buf)?;
    buf.clear();
    Ok(())
}
