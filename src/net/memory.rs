use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use super::{ReadStatus, SocketHandle};

/// Scripted in-memory [`SocketHandle`].
///
/// Each read returns at most one scripted fragment, so a test controls exactly how a request is
/// fragmented on the wire. Once the script is drained a non-blocking read reports
/// would-block, a blocking read reports end of stream if the peer is closed, or times out.
#[derive(Debug, Default)]
pub struct MemorySocket {
    input: VecDeque<Bytes>,
    closed: bool,
    output: BytesMut,
    flushes: usize,
    read_timeout: Option<Duration>,
    timeouts: Vec<Option<Duration>>,
    write_interest: bool,
}

impl MemorySocket {
    pub fn new() -> Self {
        Self::default()
    }

    /// A socket delivering `fragments` in order then reporting end of stream.
    pub fn with_fragments<I, B>(fragments: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let mut me = Self::new();
        me.input.extend(fragments.into_iter().map(Into::into));
        me.closed = true;
        me
    }

    /// Queue a fragment to be returned by a future read.
    pub fn push(&mut self, fragment: impl Into<Bytes>) {
        self.input.push_back(fragment.into());
    }

    /// Mark the peer side closed, reads report end of stream once drained.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Everything written so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn take_output(&mut self) -> BytesMut {
        self.output.split()
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Every read timeout set on this socket, in order.
    pub fn timeouts(&self) -> &[Option<Duration>] {
        &self.timeouts
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub fn wants_write(&self) -> bool {
        self.write_interest
    }
}

impl SocketHandle for MemorySocket {
    fn read(&mut self, block: bool, buf: &mut [u8]) -> io::Result<ReadStatus> {
        while self.input.front().is_some_and(Bytes::is_empty) {
            self.input.pop_front();
        }
        let Some(mut fragment) = self.input.pop_front() else {
            return match (self.closed, block) {
                (true, _) => Ok(ReadStatus::Eof),
                (false, false) => Ok(ReadStatus::WouldBlock),
                (false, true) => Err(io::ErrorKind::TimedOut.into()),
            };
        };
        let n = fragment.len().min(buf.len());
        buf[..n].copy_from_slice(&fragment[..n]);
        if n < fragment.len() {
            let rest = fragment.split_off(n);
            self.input.push_front(rest);
        }
        Ok(ReadStatus::Read(n))
    }

    fn write(&mut self, _: bool, buf: &[u8]) -> io::Result<()> {
        self.output.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self, _: bool) -> io::Result<bool> {
        self.flushes += 1;
        Ok(true)
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.read_timeout = timeout;
        self.timeouts.push(timeout);
        Ok(())
    }

    fn has_data_to_write(&self) -> bool {
        false
    }

    fn register_write_interest(&mut self) {
        self.write_interest = true;
    }
}
