//! Application side body adapters.
//!
//! A body is read or written either as bytes or as characters. The first access fixes the
//! mode for the rest of the message, mixing them is [`Misuse::ModeConflict`].
use bytes::BytesMut;

use crate::charset::Charset;
use crate::error::{Error, Misuse};
use crate::net::ReadStatus;

mod input;
mod output;

pub use input::{InputAdapter, ReadLine};
pub use output::OutputAdapter;

/// Access mode of a body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Uninit,
    Bytes,
    Chars,
}

impl Mode {
    fn fix(&mut self, mode: Mode) -> Result<(), Error> {
        match *self {
            Mode::Uninit => {
                *self = mode;
                Ok(())
            }
            current if current == mode => Ok(()),
            _ => Err(Misuse::ModeConflict.into()),
        }
    }
}

/// Decoded request body bytes, as provided by the wire input stage.
pub trait BodySource {
    /// Append body bytes to `dst`.
    fn read_body(&mut self, dst: &mut BytesMut) -> Result<ReadStatus, Error>;
}

/// The response side of the wire output stage.
pub trait ResponseSink {
    fn is_committed(&self) -> bool;

    /// Write the response head.
    fn commit(&mut self) -> Result<(), Error>;

    /// Write body bytes, committing first if needed.
    fn write(&mut self, chunk: &[u8]) -> Result<(), Error>;

    fn flush(&mut self) -> Result<(), Error>;

    fn content_length(&self) -> Option<u64>;

    fn set_content_length(&mut self, len: u64) -> Result<(), Error>;

    /// The response must not carry a body.
    fn is_head(&self) -> bool;

    /// Charset characters are encoded with.
    fn charset(&self) -> Charset;

    /// End the response body.
    fn finish(&mut self) -> Result<(), Error>;
}
