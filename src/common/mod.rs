//! Shared primitives.

/// Outcome of a resumable parsing step.
#[derive(Debug)]
pub enum ParseResult<T, E> {
    /// Bytes is not sufficient for parsing, more IO read is required.
    ///
    /// The parser state is kept, calling it again with more bytes resumes where it stopped.
    Pending,
    /// Parse success.
    Ok(T),
    /// Parse failed.
    Err(E),
}

impl<T, E> ParseResult<T, E> {
    /// Returns `true` if the parse result is [`Pending`].
    ///
    /// [`Pending`]: ParseResult::Pending
    #[inline]
    #[cfg_attr(not(test), allow(unused))]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}
