//! Request side byte buffer.
use std::ops::Range;

/// Fixed capacity byte buffer with a read position and a limit.
///
/// `position <= limit <= capacity` holds after every operation, each method asserts the
/// arguments that could break it. Bytes in `position..limit` are unread, bytes in
/// `limit..capacity` are spare room for the next socket read.
#[derive(Debug)]
pub struct WireBuffer {
    bytes: Box<[u8]>,
    pos: usize,
    limit: usize,
}

impl WireBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity].into_boxed_slice(),
            pos: 0,
            limit: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of unread bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.pos < self.limit
    }

    /// Unread bytes.
    #[inline]
    pub fn chunk(&self) -> &[u8] {
        &self.bytes[self.pos..self.limit]
    }

    /// Byte at the read position.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.chunk().first().copied()
    }

    /// Overwrite an already read byte, used to rewrite header lines in place.
    #[inline]
    pub fn set(&mut self, index: usize, byte: u8) {
        assert!(index < self.limit, "index {index} beyond limit {}", self.limit);
        self.bytes[index] = byte;
    }

    /// Valid bytes within `range`.
    #[inline]
    pub fn slice(&self, range: Range<usize>) -> &[u8] {
        assert!(range.end <= self.limit, "range end {} beyond limit {}", range.end, self.limit);
        &self.bytes[range]
    }

    #[inline]
    pub fn advance(&mut self, cnt: usize) {
        assert!(cnt <= self.remaining(), "advance {cnt} past limit");
        self.pos += cnt;
    }

    /// Drop everything from `start` on, the next read lands at `start`.
    pub fn truncate(&mut self, start: usize) {
        assert!(start <= self.limit, "truncate {start} beyond limit {}", self.limit);
        self.pos = start;
        self.limit = start;
    }

    /// Spare room between the limit and `end`, where the next socket read goes.
    ///
    /// `end` is clamped to the capacity.
    #[inline]
    pub fn spare_mut(&mut self, end: usize) -> &mut [u8] {
        let end = end.min(self.bytes.len()).max(self.limit);
        &mut self.bytes[self.limit..end]
    }

    /// Make `cnt` bytes written into [`spare_mut`](Self::spare_mut) readable.
    #[inline]
    pub fn commit(&mut self, cnt: usize) {
        assert!(self.limit + cnt <= self.bytes.len(), "commit {cnt} past capacity");
        self.limit += cnt;
    }

    /// Move unread bytes to the front of the buffer.
    pub fn compact(&mut self) {
        let start = self.pos;
        if start == 0 {
            return;
        }
        self.bytes.copy_within(start..self.limit, 0);
        self.pos = 0;
        self.limit -= start;
    }

    pub fn clear(&mut self) {
        self.pos = 0;
        self.limit = 0;
    }

    /// Append bytes to the readable region.
    #[cfg(test)]
    pub fn extend_from_slice(&mut self, data: &[u8]) -> usize {
        let spare = self.spare_mut(usize::MAX);
        let cnt = spare.len().min(data.len());
        spare[..cnt].copy_from_slice(&data[..cnt]);
        self.limit += cnt;
        cnt
    }
}
