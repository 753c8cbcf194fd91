//! Request body framing.
use bytes::BytesMut;

use crate::error::{Error, Kind};
use crate::headers::HeaderMap;
use crate::headers::standard::{CONTENT_LENGTH, TRANSFER_ENCODING};

const MAX_CHUNK_SIZE: u64 = u64::MAX >> 4;

/// Decoder for the request body of the current request.
#[derive(Debug, Default)]
pub enum BodyDecoder {
    /// No body.
    #[default]
    Void,
    /// `Content-Length` delimited body, with the number of bytes left.
    Identity(u64),
    Chunked(ChunkedDecoder),
}

impl BodyDecoder {
    /// Select the body framing announced by request headers.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, Error> {
        let mut lengths = headers.get_all(CONTENT_LENGTH).peekable();
        let mut codings = headers.get_all(TRANSFER_ENCODING).peekable();

        match (lengths.peek().is_some(), codings.peek().is_some()) {
            (false, false) => Ok(Self::Void),
            (true, true) => Err(Kind::ConflictingFraming.into()),
            (false, true) => {
                // chunked must be the one and only coding
                let mut elements = codings.flat_map(|value| value.elements());
                match (elements.next(), elements.next()) {
                    (Some(coding), None) if coding.eq_ignore_ascii_case(b"chunked") => {
                        Ok(Self::Chunked(ChunkedDecoder::new()))
                    }
                    _ => Err(Kind::UnsupportedTransferEncoding.into()),
                }
            }
            (true, false) => {
                let mut length = None;
                for value in lengths {
                    let Some(len) = value.to_u64() else {
                        return Err(Kind::InvalidContentLength.into());
                    };
                    if length.is_some_and(|prev| prev != len) {
                        return Err(Kind::InvalidContentLength.into());
                    }
                    length = Some(len);
                }
                Ok(match length {
                    Some(0) | None => Self::Void,
                    Some(len) => Self::Identity(len),
                })
            }
        }
    }

    /// Returns `true` once the whole body was decoded.
    pub fn is_done(&self) -> bool {
        match self {
            Self::Void => true,
            Self::Identity(remaining) => *remaining == 0,
            Self::Chunked(chunked) => chunked.is_done(),
        }
    }

    /// Decode from raw wire bytes into `dst`.
    ///
    /// Returns the number of bytes consumed from `src`, bytes past the end of the body are left
    /// untouched.
    pub fn decode(&mut self, src: &[u8], dst: &mut BytesMut) -> Result<usize, Error> {
        match self {
            Self::Void => Ok(0),
            Self::Identity(remaining) => {
                let cnt = (*remaining).min(src.len() as u64) as usize;
                dst.extend_from_slice(&src[..cnt]);
                *remaining -= cnt as u64;
                Ok(cnt)
            }
            Self::Chunked(chunked) => chunked.decode(src, dst),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Size,
    Extension,
    SizeLf,
    Data,
    DataCr,
    DataLf,
    TrailerStart,
    Trailer,
    EndLf,
    Done,
}

/// Resumable `Transfer-Encoding: chunked` decoder.
///
/// Chunk extensions and trailer fields are read and discarded.
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: State,
    size: u64,
    digits: u8,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: State::Size, size: 0, digits: 0 }
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    pub fn decode(&mut self, src: &[u8], dst: &mut BytesMut) -> Result<usize, Error> {
        let mut read = 0;

        while read < src.len() && self.state != State::Done {
            let byte = src[read];

            if self.state == State::Data {
                let cnt = self.size.min((src.len() - read) as u64) as usize;
                dst.extend_from_slice(&src[read..read + cnt]);
                self.size -= cnt as u64;
                read += cnt;
                if self.size == 0 {
                    self.state = State::DataCr;
                }
                continue;
            }

            self.state = match (self.state, byte) {
                (State::Size, b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F') => {
                    let digit = (byte as char).to_digit(16).unwrap_or(0) as u64;
                    self.size = self.size * 16 + digit;
                    self.digits += 1;
                    if self.size > MAX_CHUNK_SIZE {
                        return Err(Kind::InvalidChunk.into());
                    }
                    State::Size
                }
                (State::Size, _) if self.digits == 0 => return Err(Kind::InvalidChunk.into()),
                (State::Size, b';' | b' ' | b'\t') => State::Extension,
                (State::Size | State::Extension, b'\r') => State::SizeLf,
                (State::Size | State::Extension | State::SizeLf, b'\n') => self.end_size(),
                (State::Extension, _) => State::Extension,

                (State::DataCr, b'\r') => State::DataLf,
                (State::DataCr | State::DataLf, b'\n') => {
                    self.digits = 0;
                    State::Size
                }

                (State::TrailerStart, b'\r') => State::EndLf,
                (State::TrailerStart | State::EndLf, b'\n') => State::Done,
                (State::Trailer, b'\n') => State::TrailerStart,
                (State::TrailerStart | State::Trailer, _) => State::Trailer,

                _ => return Err(Kind::InvalidChunk.into()),
            };
            read += 1;
        }

        Ok(read)
    }

    fn end_size(&mut self) -> State {
        if self.size == 0 {
            State::TrailerStart
        } else {
            State::Data
        }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use bytes::BytesMut;

    use super::{BodyDecoder, ChunkedDecoder};
    use crate::error::Kind;
    use crate::headers::{HeaderMap, HeaderName, HeaderValue};

    fn decode_all(input: &[u8], split: usize) -> Result<(Vec<u8>, usize), crate::error::Error> {
        let mut decoder = ChunkedDecoder::new();
        let mut dst = BytesMut::new();
        let mut read = 0;
        for chunk in input.chunks(split.max(1)) {
            let mut at = 0;
            while at < chunk.len() && !decoder.is_done() {
                at += decoder.decode(&chunk[at..], &mut dst)?;
            }
            read += at;
            if decoder.is_done() {
                break;
            }
        }
        assert!(decoder.is_done());
        Ok((dst.to_vec(), read))
    }

    #[test]
    fn chunked_body() {
        let input = b"5\r\nhello\r\n6;ext=1\r\n world\r\n0\r\nX-Trailer: t\r\n\r\nNEXT";
        for split in 1..input.len() {
            let (body, read) = decode_all(input, split).unwrap();
            assert_eq!(body, b"hello world", "split {split}");
            assert_eq!(&input[read..], b"NEXT", "split {split}");
        }

        let (body, _) = decode_all(b"A\nabcdefghij\n0\n\n", 64).unwrap();
        assert_eq!(body, b"abcdefghij");

        for split in 1..8 {
            let (body, read) = decode_all(b"1\nz\n0\nA: 1\nB: 2\n\n", split).unwrap();
            assert_eq!(body, b"z", "split {split}");
            assert_eq!(read, 17, "split {split}");
        }
    }

    #[test]
    fn chunked_errors() {
        macro_rules! invalid {
            ($input:literal) => {
                let mut dst = BytesMut::new();
                let err = ChunkedDecoder::new().decode($input, &mut dst).unwrap_err();
                assert!(matches!(err.kind(), Kind::InvalidChunk), "{:?}", $input);
            };
        }

        invalid!(b"\r\n");
        invalid!(b"z\r\n");
        invalid!(b"3\r\nabcX");
        invalid!(b"3\rX");
        invalid!(b"fffffffffffffffff\r\n");
    }

    #[test]
    fn framing_from_headers() {
        fn headers(fields: &[(&str, &str)]) -> HeaderMap {
            let mut map = HeaderMap::new();
            for (name, value) in fields {
                map.append(
                    name.parse::<HeaderName>().unwrap(),
                    value.parse::<HeaderValue>().unwrap(),
                );
            }
            map
        }

        macro_rules! framing {
            ($fields:expr => $ok:pat) => {
                let decoder = BodyDecoder::from_headers(&headers(&$fields)).unwrap();
                assert!(matches!(decoder, $ok), "{}", stringify!($fields));
            };
            ($fields:expr => #[error] $kind:pat) => {
                let err = BodyDecoder::from_headers(&headers(&$fields)).unwrap_err();
                assert!(matches!(err.kind(), $kind), "{}", stringify!($fields));
            };
        }

        framing!([] => BodyDecoder::Void);
        framing!([("content-length", "0")] => BodyDecoder::Void);
        framing!([("content-length", "12")] => BodyDecoder::Identity(12));
        framing!([("content-length", "12"), ("content-length", "12")] => BodyDecoder::Identity(12));
        framing!([("transfer-encoding", "Chunked")] => BodyDecoder::Chunked(_));

        framing!([("content-length", "12"), ("content-length", "13")] => #[error] Kind::InvalidContentLength);
        framing!([("content-length", "-1")] => #[error] Kind::InvalidContentLength);
        framing!([("content-length", "1 2")] => #[error] Kind::InvalidContentLength);
        framing!([("transfer-encoding", "gzip")] => #[error] Kind::UnsupportedTransferEncoding);
        framing!([("transfer-encoding", "gzip, chunked")] => #[error] Kind::UnsupportedTransferEncoding);
        framing!(
            [("transfer-encoding", "chunked"), ("content-length", "3")]
            => #[error] Kind::ConflictingFraming
        );
    }
}
