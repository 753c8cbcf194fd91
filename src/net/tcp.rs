use bytes::{Buf, BytesMut};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use super::{ReadStatus, SocketHandle};

/// [`SocketHandle`] over a standard library TCP stream.
///
/// The stream's non-blocking flag is switched to match each call. Bytes a non-blocking write
/// could not send are kept and sent by later writes or flushes.
#[derive(Debug)]
pub struct TcpSocket {
    stream: TcpStream,
    nonblocking: bool,
    pending: BytesMut,
    write_interest: bool,
}

impl TcpSocket {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            nonblocking: false,
            pending: BytesMut::new(),
            write_interest: false,
        })
    }

    pub fn get_ref(&self) -> &TcpStream {
        &self.stream
    }

    pub fn into_inner(self) -> TcpStream {
        self.stream
    }

    /// Returns `true` once write interest was registered and not yet served by a flush.
    pub fn wants_write(&self) -> bool {
        self.write_interest
    }

    fn mode(&mut self, block: bool) -> io::Result<()> {
        if self.nonblocking == block {
            self.stream.set_nonblocking(!block)?;
            self.nonblocking = !block;
        }
        Ok(())
    }

    /// Write pending bytes, stops early on would-block.
    fn drain(&mut self) -> io::Result<()> {
        while self.pending.has_remaining() {
            match self.stream.write(&self.pending) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => self.pending.advance(n),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

impl SocketHandle for TcpSocket {
    fn read(&mut self, block: bool, buf: &mut [u8]) -> io::Result<ReadStatus> {
        self.mode(block)?;
        loop {
            return match self.stream.read(buf) {
                Ok(0) => Ok(ReadStatus::Eof),
                Ok(n) => Ok(ReadStatus::Read(n)),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock && !block => {
                    Ok(ReadStatus::WouldBlock)
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => Err(err),
            };
        }
    }

    fn write(&mut self, block: bool, buf: &[u8]) -> io::Result<()> {
        self.mode(block)?;
        self.pending.extend_from_slice(buf);
        self.drain()
    }

    fn flush(&mut self, block: bool) -> io::Result<bool> {
        self.mode(block)?;
        self.drain()?;
        if self.pending.is_empty() {
            self.write_interest = false;
            self.stream.flush()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }

    fn has_data_to_write(&self) -> bool {
        !self.pending.is_empty()
    }

    fn register_write_interest(&mut self) {
        self.write_interest = true;
    }
}
