use bytes::{BufMut, BytesMut};

use super::Charset;

/// Substituted for malformed input when decoding.
pub const REPLACEMENT: char = '\u{FFFD}';

/// Substituted for unmappable characters when encoding to a single byte charset.
const UNMAPPABLE: u8 = b'?';

// ===== Decoder =====

/// Stateful bytes to characters converter.
///
/// A multi-byte sequence split across two input slices is kept in `pending` until the rest of
/// it arrives, so the caller can feed arbitrary fragments of a body.
#[derive(Debug)]
pub struct Decoder {
    charset: Charset,
    pending: [u8; 4],
    pending_len: u8,
    needed: u8,
}

impl Decoder {
    pub fn new(charset: Charset) -> Self {
        Self {
            charset,
            pending: [0; 4],
            pending_len: 0,
            needed: 0,
        }
    }

    pub const fn charset(&self) -> Charset {
        self.charset
    }

    /// Returns `true` if an incomplete sequence is held back.
    pub const fn has_pending(&self) -> bool {
        self.pending_len != 0
    }

    /// Decode from `src` into `dst`, appending at most `max` characters.
    ///
    /// Returns the number of bytes consumed from `src`.
    pub fn decode(&mut self, src: &[u8], dst: &mut Vec<char>, max: usize) -> usize {
        let start = dst.len();
        let mut read = 0;

        while read < src.len() && dst.len() - start < max {
            let byte = src[read];
            match self.charset {
                Charset::Latin1 => dst.push(byte as char),
                Charset::Ascii => dst.push(if byte.is_ascii() { byte as char } else { REPLACEMENT }),
                Charset::Utf8 => {
                    if !self.push_utf8(byte, dst) {
                        // the byte broke a pending sequence, decode it again as a lead byte
                        continue;
                    }
                }
            }
            read += 1;
        }

        read
    }

    /// Returns `false` when `byte` was not consumed.
    fn push_utf8(&mut self, byte: u8, dst: &mut Vec<char>) -> bool {
        if self.pending_len == 0 {
            let needed = match byte {
                0x00..=0x7f => {
                    dst.push(byte as char);
                    return true;
                }
                0xc2..=0xdf => 2,
                0xe0..=0xef => 3,
                0xf0..=0xf4 => 4,
                _ => {
                    dst.push(REPLACEMENT);
                    return true;
                }
            };
            self.pending[0] = byte;
            self.pending_len = 1;
            self.needed = needed;
            return true;
        }

        if byte & 0xc0 != 0x80 {
            dst.push(REPLACEMENT);
            self.pending_len = 0;
            return false;
        }

        self.pending[self.pending_len as usize] = byte;
        self.pending_len += 1;

        if self.pending_len == self.needed {
            let seq = &self.pending[..self.pending_len as usize];
            match std::str::from_utf8(seq).ok().and_then(|s| s.chars().next()) {
                Some(ch) => dst.push(ch),
                None => dst.push(REPLACEMENT),
            }
            self.pending_len = 0;
        }
        true
    }

    /// Flush a trailing incomplete sequence at end of input.
    pub fn finish(&mut self, dst: &mut Vec<char>) {
        if self.pending_len != 0 {
            dst.push(REPLACEMENT);
            self.pending_len = 0;
        }
    }

    pub fn reset(&mut self) {
        self.pending_len = 0;
        self.needed = 0;
    }
}

// ===== Encoder =====

/// Characters to bytes converter.
///
/// Only whole characters are written, a character whose encoding does not fit in the space
/// given is left for the next call.
#[derive(Debug)]
pub struct Encoder {
    charset: Charset,
}

impl Encoder {
    pub fn new(charset: Charset) -> Self {
        Self { charset }
    }

    pub const fn charset(&self) -> Charset {
        self.charset
    }

    /// Number of bytes `ch` occupies once encoded.
    pub fn encoded_len(&self, ch: char) -> usize {
        match self.charset {
            Charset::Utf8 => ch.len_utf8(),
            Charset::Latin1 | Charset::Ascii => 1,
        }
    }

    /// Encode from `src` into `dst`, writing at most `room` bytes.
    ///
    /// Returns the number of bytes of `src` consumed, always on a character boundary.
    pub fn encode(&mut self, src: &str, dst: &mut BytesMut, room: usize) -> usize {
        let mut written = 0;
        let mut consumed = 0;

        for ch in src.chars() {
            let len = self.encoded_len(ch);
            if written + len > room {
                break;
            }
            match self.charset {
                Charset::Utf8 => {
                    let mut tmp = [0; 4];
                    dst.put_slice(ch.encode_utf8(&mut tmp).as_bytes());
                }
                Charset::Latin1 => dst.put_u8(u8::try_from(ch as u32).unwrap_or(UNMAPPABLE)),
                Charset::Ascii => dst.put_u8(if ch.is_ascii() { ch as u8 } else { UNMAPPABLE }),
            }
            written += len;
            consumed += ch.len_utf8();
        }

        consumed
    }

    pub fn reset(&mut self) { }
}
