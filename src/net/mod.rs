//! Socket handles.
//!
//! The connector never touches a socket directly, it goes through [`SocketHandle`], whose every
//! read, write and flush takes a `block` flag. The same parsing and framing code serves blocking
//! callers and non-blocking callers, only this flag differs.
use std::io;
use std::time::Duration;

mod memory;
mod tcp;

pub use memory::MemorySocket;
pub use tcp::TcpSocket;

/// Result of a read that is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Bytes were read, never zero.
    Read(usize),
    /// Non-blocking read with no data available, try again later.
    WouldBlock,
    /// The peer closed its side of the connection.
    Eof,
}

/// Byte oriented I/O capability provided by the network layer.
pub trait SocketHandle {
    /// Read into `buf`.
    fn read(&mut self, block: bool, buf: &mut [u8]) -> io::Result<ReadStatus>;

    /// Write all of `buf`.
    ///
    /// In non-blocking mode the handle may keep bytes it could not send yet, see
    /// [`has_data_to_write`](SocketHandle::has_data_to_write).
    fn write(&mut self, block: bool, buf: &[u8]) -> io::Result<()>;

    /// Send pending bytes, returns `true` when nothing is left pending.
    fn flush(&mut self, block: bool) -> io::Result<bool>;

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    fn has_data_to_write(&self) -> bool;

    /// Ask the network layer to signal when the socket becomes writable again.
    fn register_write_interest(&mut self);
}

impl<S: SocketHandle + ?Sized> SocketHandle for &mut S {
    fn read(&mut self, block: bool, buf: &mut [u8]) -> io::Result<ReadStatus> {
        (**self).read(block, buf)
    }

    fn write(&mut self, block: bool, buf: &[u8]) -> io::Result<()> {
        (**self).write(block, buf)
    }

    fn flush(&mut self, block: bool) -> io::Result<bool> {
        (**self).flush(block)
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        (**self).set_read_timeout(timeout)
    }

    fn has_data_to_write(&self) -> bool {
        (**self).has_data_to_write()
    }

    fn register_write_interest(&mut self) {
        (**self).register_write_interest()
    }
}
