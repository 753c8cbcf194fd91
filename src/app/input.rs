use std::sync::Arc;

use bytes::{Buf, BytesMut};

use super::{BodySource, Mode};
use crate::charset::{Charset, ConverterPool, Decoder};
use crate::config::Config;
use crate::error::{Error, Misuse};
use crate::net::ReadStatus;

/// Outcome of [`InputAdapter::read_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    /// A line, without its terminator.
    Line(String),
    /// No complete line is buffered yet and the source would block. Nothing was consumed.
    WouldBlock,
    /// End of the body.
    Eof,
}

/// Buffer with a read position and an optional mark.
///
/// `data.len()` is the limit. A mark pins `mark..` in the buffer until the reader moved
/// `read_limit` items past it.
#[derive(Debug)]
struct MarkBuffer<T> {
    data: Vec<T>,
    pos: usize,
    mark: Option<usize>,
    read_limit: usize,
}

impl<T: Copy> MarkBuffer<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            pos: 0,
            mark: None,
            read_limit: 0,
        }
    }

    fn available(&self) -> usize {
        self.data.len() - self.pos
    }

    fn unread(&self) -> &[T] {
        &self.data[self.pos..]
    }

    fn consume(&mut self, cnt: usize) {
        assert!(cnt <= self.available(), "consume {cnt} past limit");
        self.pos += cnt;
        if self.mark.is_some_and(|mark| self.pos - mark > self.read_limit) {
            self.mark = None;
        }
    }

    fn mark(&mut self, read_limit: usize) {
        self.mark = Some(self.pos);
        self.read_limit = read_limit;
    }

    fn reset(&mut self) -> Result<(), Error> {
        let mark = self.mark.ok_or(Misuse::ResetWithoutMark)?;
        self.pos = mark;
        Ok(())
    }

    /// Make room before reading up to `count` more items.
    ///
    /// Consumed items are dropped unless marked. A marked buffer is only compacted once its
    /// capacity exceeds `compact_at` and more was consumed before the mark than is kept after
    /// it.
    fn make_room(&mut self, count: usize, compact_at: usize, ceiling: usize) {
        match self.mark {
            None => {
                self.data.drain(..self.pos);
                self.pos = 0;
            }
            Some(mark) => {
                let kept = self.data.len() - mark;
                if mark > 0 && self.data.capacity() > compact_at && kept < mark {
                    self.data.drain(..mark);
                    self.pos -= mark;
                    self.mark = Some(0);
                }
            }
        }
        self.make_space(count, ceiling);
    }

    /// Double the capacity up to `ceiling`, adding `count` on top when doubling is not enough.
    fn make_space(&mut self, count: usize, ceiling: usize) {
        let cap = self.data.capacity();
        let len = self.data.len();
        if cap - len >= count {
            return;
        }
        let doubled = (cap * 2).min(ceiling.max(cap));
        let new_cap = match doubled >= len + count {
            true => doubled,
            false => doubled + count,
        };
        self.data.reserve_exact(new_cap - len);
    }

    fn clear(&mut self) {
        self.data.clear();
        self.pos = 0;
        self.mark = None;
        self.read_limit = 0;
    }
}

/// Request body as bytes or characters, with mark and reset.
#[derive(Debug)]
pub struct InputAdapter {
    mode: Mode,
    /// Body bytes not yet decoded to characters.
    raw: BytesMut,
    bytes: MarkBuffer<u8>,
    chars: MarkBuffer<char>,
    decoder: Option<Decoder>,
    charset: Charset,
    pool: Arc<ConverterPool>,
    eof: bool,

    byte_size: usize,
    char_size: usize,
    ceiling: usize,
    compact_factor: usize,
    max_line: usize,
}

impl InputAdapter {
    pub fn new(config: &Config, pool: Arc<ConverterPool>) -> Self {
        Self {
            mode: Mode::Uninit,
            raw: BytesMut::new(),
            bytes: MarkBuffer::with_capacity(config.input_buffer_size),
            chars: MarkBuffer::with_capacity(config.char_buffer_size),
            decoder: None,
            charset: config.default_request_charset,
            pool,
            eof: false,
            byte_size: config.input_buffer_size.max(1),
            char_size: config.char_buffer_size.max(1),
            ceiling: config.char_buffer_ceiling,
            compact_factor: config.char_compact_factor,
            max_line: config.max_line_length.max(1),
        }
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Charset used once the body is read as characters.
    pub fn set_charset(&mut self, charset: Charset) {
        if self.decoder.is_none() {
            self.charset = charset;
        }
    }

    #[inline]
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Buffered items readable without touching the source.
    pub fn available(&self) -> usize {
        match self.mode {
            Mode::Chars => self.chars.available(),
            Mode::Bytes | Mode::Uninit => self.bytes.available(),
        }
    }

    // ===== Bytes =====

    /// Read body bytes into `dst`.
    pub fn read<B: BodySource + ?Sized>(
        &mut self,
        src: &mut B,
        dst: &mut [u8],
    ) -> Result<ReadStatus, Error> {
        self.mode.fix(Mode::Bytes)?;
        if dst.is_empty() {
            return Ok(ReadStatus::Read(0));
        }
        if self.bytes.available() == 0 {
            match self.fill_bytes(src)? {
                ReadStatus::Read(_) => {}
                status => return Ok(status),
            }
        }
        let cnt = dst.len().min(self.bytes.available());
        dst[..cnt].copy_from_slice(&self.bytes.unread()[..cnt]);
        self.bytes.consume(cnt);
        Ok(ReadStatus::Read(cnt))
    }

    fn fill_bytes<B: BodySource + ?Sized>(&mut self, src: &mut B) -> Result<ReadStatus, Error> {
        if self.eof {
            return Ok(ReadStatus::Eof);
        }
        self.bytes.make_room(self.byte_size, self.compact_factor * self.byte_size, self.ceiling);
        self.raw.clear();
        let status = src.read_body(&mut self.raw)?;
        match status {
            ReadStatus::Read(_) => self.bytes.data.extend_from_slice(&self.raw),
            ReadStatus::Eof => self.eof = true,
            ReadStatus::WouldBlock => {}
        }
        self.raw.clear();
        Ok(status)
    }

    // ===== Chars =====

    /// Append at most `max` characters to `dst`.
    pub fn read_chars<B: BodySource + ?Sized>(
        &mut self,
        src: &mut B,
        dst: &mut String,
        max: usize,
    ) -> Result<ReadStatus, Error> {
        self.mode.fix(Mode::Chars)?;
        if max == 0 {
            return Ok(ReadStatus::Read(0));
        }
        if self.chars.available() == 0 {
            match self.fill_chars(src)? {
                ReadStatus::Read(_) => {}
                status => return Ok(status),
            }
        }
        let cnt = max.min(self.chars.available());
        dst.extend(&self.chars.unread()[..cnt]);
        self.chars.consume(cnt);
        Ok(ReadStatus::Read(cnt))
    }

    /// Decode at least one more character into the buffer.
    fn fill_chars<B: BodySource + ?Sized>(&mut self, src: &mut B) -> Result<ReadStatus, Error> {
        self.chars.make_room(self.char_size, self.compact_factor * self.char_size, self.ceiling);
        loop {
            if self.raw.is_empty() {
                if self.eof {
                    let before = self.chars.data.len();
                    if let Some(decoder) = self.decoder.as_mut() {
                        decoder.finish(&mut self.chars.data);
                    }
                    let cnt = self.chars.data.len() - before;
                    return Ok(match cnt {
                        0 => ReadStatus::Eof,
                        _ => ReadStatus::Read(cnt),
                    });
                }
                match src.read_body(&mut self.raw)? {
                    ReadStatus::Read(_) => {}
                    ReadStatus::Eof => {
                        self.eof = true;
                        continue;
                    }
                    ReadStatus::WouldBlock => return Ok(ReadStatus::WouldBlock),
                }
            }

            let room = self.chars.data.capacity() - self.chars.data.len();
            let mut raw = std::mem::take(&mut self.raw);
            let before = self.chars.data.len();
            let decoder = self.decoder.get_or_insert_with(|| self.pool.take_decoder(self.charset));
            let used = decoder.decode(&raw, &mut self.chars.data, room.max(1));
            raw.advance(used);
            self.raw = raw;

            let cnt = self.chars.data.len() - before;
            if cnt > 0 {
                return Ok(ReadStatus::Read(cnt));
            }
        }
    }

    /// Read a line terminated by CR, LF or CRLF.
    ///
    /// The line is only consumed once its terminator was seen, a lone CR is recognized by
    /// looking at the following character and leaving it unread.
    pub fn read_line<B: BodySource + ?Sized>(&mut self, src: &mut B) -> Result<ReadLine, Error> {
        self.mode.fix(Mode::Chars)?;
        let mut scanned = 0;

        loop {
            let avail = self.chars.available();
            while scanned < avail {
                let window = (scanned + self.max_line).min(avail);
                let unread = self.chars.unread();
                let Some(at) = unread[scanned..window].iter().position(|&c| c == '\r' || c == '\n')
                else {
                    scanned = window;
                    continue;
                };
                let at = scanned + at;

                let consumed = match unread[at] {
                    '\n' => at + 1,
                    _ => match unread.get(at + 1) {
                        Some('\n') => at + 2,
                        Some(_) => at + 1,
                        // need the next char to tell CR from CRLF
                        None if self.eof && self.raw.is_empty() => at + 1,
                        None => break,
                    },
                };
                let line = unread[..at].iter().collect();
                self.chars.consume(consumed);
                return Ok(ReadLine::Line(line));
            }

            match self.fill_chars(src)? {
                ReadStatus::Read(_) => {}
                ReadStatus::WouldBlock => return Ok(ReadLine::WouldBlock),
                ReadStatus::Eof => {
                    let avail = self.chars.available();
                    if avail == 0 {
                        return Ok(ReadLine::Eof);
                    }
                    // unterminated last line
                    let line: String = self.chars.unread().iter().collect();
                    let line = line.strip_suffix('\r').map(str::to_owned).unwrap_or(line);
                    self.chars.consume(avail);
                    return Ok(ReadLine::Line(line));
                }
            }
        }
    }

    // ===== Mark =====

    /// Remember the read position, valid until `read_ahead` more items were read.
    pub fn mark(&mut self, read_ahead: usize) {
        match self.mode {
            Mode::Bytes => self.bytes.mark(read_ahead),
            Mode::Chars => self.chars.mark(read_ahead),
            Mode::Uninit => {
                self.bytes.mark(read_ahead);
                self.chars.mark(read_ahead);
            }
        }
    }

    /// Rewind to the mark.
    ///
    /// # Errors
    ///
    /// Returns [`Misuse::ResetWithoutMark`] if no mark was set, or if it was invalidated by
    /// reading past its read ahead limit.
    pub fn reset(&mut self) -> Result<(), Error> {
        match self.mode {
            Mode::Bytes | Mode::Uninit => self.bytes.reset(),
            Mode::Chars => self.chars.reset(),
        }
    }

    // ===== Lifecycle =====

    /// Forget the body of the previous request.
    pub fn recycle(&mut self) {
        self.mode = Mode::Uninit;
        self.raw.clear();
        self.bytes.clear();
        self.chars.clear();
        if self.chars.data.capacity() > self.ceiling {
            self.chars = MarkBuffer::with_capacity(self.char_size);
        }
        if self.bytes.data.capacity() > self.ceiling {
            self.bytes = MarkBuffer::with_capacity(self.byte_size);
        }
        if let Some(decoder) = self.decoder.take() {
            self.pool.put_decoder(decoder);
        }
        self.eof = false;
    }
}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use bytes::BytesMut;

    use super::{InputAdapter, MarkBuffer, ReadLine};
    use crate::app::{BodySource, Mode};
    use crate::charset::{Charset, ConverterPool};
    use crate::config::Config;
    use crate::error::{Error, Kind, Misuse};
    use crate::net::ReadStatus;

    /// Delivers scripted body fragments, `None` is a would-block.
    struct Script(VecDeque<Option<&'static [u8]>>);

    impl BodySource for Script {
        fn read_body(&mut self, dst: &mut BytesMut) -> Result<ReadStatus, Error> {
            Ok(match self.0.pop_front() {
                Some(Some(bytes)) => {
                    dst.extend_from_slice(bytes);
                    ReadStatus::Read(bytes.len())
                }
                Some(None) => ReadStatus::WouldBlock,
                None => ReadStatus::Eof,
            })
        }
    }

    fn script(fragments: &[Option<&'static [u8]>]) -> Script {
        Script(fragments.iter().copied().collect())
    }

    fn adapter(cfg: Config) -> (InputAdapter, Arc<ConverterPool>) {
        let pool = Arc::new(ConverterPool::new(4));
        (InputAdapter::new(&cfg, pool.clone()), pool)
    }

    fn small() -> Config {
        Config {
            input_buffer_size: 4,
            char_buffer_size: 4,
            char_buffer_ceiling: 16,
            max_line_length: 3,
            ..Config::default()
        }
    }

    fn read_all(input: &mut InputAdapter, src: &mut Script, n: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0; 3];
        while out.len() < n {
            let want = buf.len().min(n - out.len());
            match input.read(src, &mut buf[..want]).unwrap() {
                ReadStatus::Read(cnt) => out.extend_from_slice(&buf[..cnt]),
                _ => break,
            }
        }
        out
    }

    #[test]
    fn mark_reset_bytes() {
        let (mut input, _) = adapter(small());
        let mut src = script(&[Some(b"abcd"), Some(b"efgh"), Some(b"ijkl")]);

        assert_eq!(read_all(&mut input, &mut src, 2), b"ab");
        input.mark(6);
        assert_eq!(read_all(&mut input, &mut src, 6), b"cdefgh");
        input.reset().unwrap();
        assert_eq!(read_all(&mut input, &mut src, 10), b"cdefghijkl");

        // the mark was invalidated by reading past its limit
        let err = input.reset().unwrap_err();
        assert!(matches!(err.kind(), Kind::Misuse(Misuse::ResetWithoutMark)));
        assert_eq!(input.read(&mut src, &mut [0; 4]).unwrap(), ReadStatus::Eof);
    }

    #[test]
    fn reset_without_mark() {
        let (mut input, _) = adapter(small());
        let err = input.reset().unwrap_err();
        assert!(matches!(err.kind(), Kind::Misuse(Misuse::ResetWithoutMark)));
    }

    #[test]
    fn mode_is_fixed() {
        let (mut input, _) = adapter(small());
        let mut src = script(&[Some(b"ab")]);
        input.read(&mut src, &mut [0; 1]).unwrap();
        assert_eq!(input.mode(), Mode::Bytes);

        let err = input.read_line(&mut src).unwrap_err();
        assert!(matches!(err.kind(), Kind::Misuse(Misuse::ModeConflict)));

        input.recycle();
        assert_eq!(input.mode(), Mode::Uninit);
        assert!(input.read_line(&mut script(&[Some(b"x\n")])).is_ok());
    }

    #[test]
    fn read_lines() {
        let (mut input, _) = adapter(small());
        let mut src = script(&[
            Some(b"one\r"),
            Some(b"\ntwo\rthr"),
            None,
            Some(b"ee\nlonger line"),
            Some(b" continues\r"),
        ]);

        let mut lines = Vec::new();
        loop {
            match input.read_line(&mut src).unwrap() {
                ReadLine::Line(line) => lines.push(line),
                ReadLine::WouldBlock => lines.push("<blocked>".into()),
                ReadLine::Eof => break,
            }
        }
        assert_eq!(
            lines,
            ["one", "two", "<blocked>", "three", "longer line continues"]
        );
    }

    #[test]
    fn mark_reset_chars_utf8() {
        let (mut input, pool) = adapter(small());
        input.set_charset(Charset::Utf8);
        let mut src = script(&[Some("h\u{e9}l".as_bytes()), Some(&[0xe2, 0x82]), Some(&[0xac, b'!'])]);

        let mut out = String::new();
        input.read_chars(&mut src, &mut out, 1).unwrap();
        input.mark(8);
        while let ReadStatus::Read(_) = input.read_chars(&mut src, &mut out, 2).unwrap() {}
        assert_eq!(out, "h\u{e9}l\u{20ac}!");

        input.reset().unwrap();
        let mut again = String::new();
        while let ReadStatus::Read(_) = input.read_chars(&mut src, &mut again, 8).unwrap() {}
        assert_eq!(again, "\u{e9}l\u{20ac}!");

        input.recycle();
        assert_eq!(pool.idle(Charset::Utf8), (1, 0));
    }

    #[test]
    fn char_buffer_growth_and_replacement() {
        let (mut input, _) = adapter(small());
        let body = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut src = Script(body.chunks(5).map(Some).collect());

        input.mark(64);
        let mut out = String::new();
        while let ReadStatus::Read(_) = input.read_chars(&mut src, &mut out, 7).unwrap() {}
        assert_eq!(out.as_bytes(), body);

        // everything stayed buffered for the mark
        input.reset().unwrap();
        assert_eq!(input.available(), body.len());

        // grown past the ceiling, replaced on recycle
        input.recycle();
        assert!(input.chars.data.capacity() <= 16);
    }

    #[test]
    fn mark_buffer_compaction() {
        let mut buf = MarkBuffer::with_capacity(4);
        buf.data.extend(0..10u8);
        buf.consume(8);
        buf.mark(4);
        buf.consume(1);

        // still too small to compact
        buf.make_room(1, 64, 64);
        assert_eq!(buf.data.len(), 10);

        buf.make_room(1, 4, 64);
        assert_eq!(buf.data, [8, 9]);
        assert_eq!(buf.unread(), [9]);
        buf.reset().unwrap();
        assert_eq!(buf.unread(), [8, 9]);
    }

    #[test]
    fn mark_buffer_growth() {
        let mut buf = MarkBuffer::<u8>::with_capacity(4);
        buf.data.extend([0; 4]);
        buf.mark(64);

        // doubling up to the ceiling is enough
        buf.make_space(4, 16);
        assert!(buf.data.capacity() >= 8);

        // doubling is not, the requested count is added on top
        let cap = buf.data.capacity();
        buf.make_space(cap * 4, cap);
        assert!(buf.data.capacity() >= buf.data.len() + cap * 4);
    }
}
