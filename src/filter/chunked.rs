use super::{OutputFilter, OutputSink};
use crate::error::Error;

const CRLF: &[u8] = b"\r\n";
const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

/// `Transfer-Encoding: chunked` framing.
///
/// Every write becomes one chunk, `end` writes the last chunk with an empty trailer.
#[derive(Debug, Default)]
pub struct ChunkedFilter;

/// Chunk size line, hex digits then CRLF, written right-aligned into `buf`.
fn size_line(len: usize, buf: &mut [u8; 18]) -> &[u8] {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut at = buf.len() - 2;
    buf[at..].copy_from_slice(CRLF);
    let mut len = len;
    loop {
        at -= 1;
        buf[at] = HEX[len & 0xf];
        len >>= 4;
        if len == 0 {
            return &buf[at..];
        }
    }
}

impl OutputFilter for ChunkedFilter {
    fn do_write(&mut self, chunk: &[u8], next: &mut dyn OutputSink) -> Result<(), Error> {
        if chunk.is_empty() {
            // an empty chunk would read as the last one
            return Ok(());
        }
        let mut buf = [0; 18];
        next.write(size_line(chunk.len(), &mut buf))?;
        next.write(chunk)?;
        next.write(CRLF)
    }

    fn end(&mut self, next: &mut dyn OutputSink) -> Result<(), Error> {
        next.write(LAST_CHUNK)?;
        next.end()
    }

    fn recycle(&mut self) {}
}
