//! Output filter chain.
//!
//! Filters are registered once per connection and activated per response. The first activated
//! filter writes into the socket sink, every later one writes into the filter activated before
//! it, so writes, flushes and the final `end` all enter at the last activated filter and flow
//! toward the socket in reverse activation order.
use crate::error::Error;

mod chunked;
mod decoder;
mod identity;
mod void;

pub use chunked::ChunkedFilter;
pub use decoder::{BodyDecoder, ChunkedDecoder};
pub use identity::IdentityFilter;
pub use void::VoidFilter;

/// Where a filter sends its output.
pub trait OutputSink {
    fn write(&mut self, chunk: &[u8]) -> Result<(), Error>;

    fn flush(&mut self) -> Result<(), Error>;

    /// No more body bytes will be written.
    fn end(&mut self) -> Result<(), Error>;
}

/// Response properties a filter is configured from when activated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseInfo {
    pub content_length: Option<u64>,
    pub head: bool,
}

/// A transform between the response body and the socket.
pub trait OutputFilter: Send {
    /// Called when the filter is activated for a response.
    fn set_response(&mut self, info: &ResponseInfo) {
        let _ = info;
    }

    fn do_write(&mut self, chunk: &[u8], next: &mut dyn OutputSink) -> Result<(), Error>;

    fn flush(&mut self, next: &mut dyn OutputSink) -> Result<(), Error> {
        next.flush()
    }

    /// Write any trailing bytes, then end `next`.
    fn end(&mut self, next: &mut dyn OutputSink) -> Result<(), Error> {
        next.end()
    }

    /// Reset per response state.
    fn recycle(&mut self);
}

/// Index of a registered filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterId(usize);

struct Active {
    id: FilterId,
    filter: Box<dyn OutputFilter>,
}

/// Registered filters plus the active chain of the current response.
#[derive(Default)]
pub struct FilterChain {
    registered: Vec<Option<Box<dyn OutputFilter>>>,
    active: Vec<Active>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter for later activation.
    pub fn add(&mut self, filter: Box<dyn OutputFilter>) -> FilterId {
        self.registered.push(Some(filter));
        FilterId(self.registered.len() - 1)
    }

    /// Activate a registered filter on top of the chain.
    ///
    /// Returns `false` if the filter is unknown or already active.
    pub fn activate(&mut self, id: FilterId, info: &ResponseInfo) -> bool {
        let Some(mut filter) = self.registered.get_mut(id.0).and_then(Option::take) else {
            return false;
        };
        filter.set_response(info);
        self.active.push(Active { id, filter });
        true
    }

    pub fn is_active(&self, id: FilterId) -> bool {
        self.active.iter().any(|a| a.id == id)
    }

    pub fn has_active(&self) -> bool {
        !self.active.is_empty()
    }

    /// Write into the outermost active filter.
    pub fn write(&mut self, chunk: &[u8], sink: &mut dyn OutputSink) -> Result<(), Error> {
        ChainLink { rest: &mut self.active, sink }.write(chunk)
    }

    pub fn flush(&mut self, sink: &mut dyn OutputSink) -> Result<(), Error> {
        ChainLink { rest: &mut self.active, sink }.flush()
    }

    pub fn end(&mut self, sink: &mut dyn OutputSink) -> Result<(), Error> {
        ChainLink { rest: &mut self.active, sink }.end()
    }

    /// Deactivate every filter, outermost first, returning them to their registration slots.
    pub fn recycle(&mut self) {
        while let Some(Active { id, mut filter }) = self.active.pop() {
            filter.recycle();
            if let Some(slot) = self.registered.get_mut(id.0) {
                *slot = Some(filter);
            }
        }
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("registered", &self.registered.len())
            .field("active", &self.active.iter().map(|a| a.id.0).collect::<Vec<_>>())
            .finish()
    }
}

/// The chain below some filter: the remaining active filters, then the socket sink.
struct ChainLink<'a, 's> {
    rest: &'a mut [Active],
    sink: &'a mut (dyn OutputSink + 's),
}

impl OutputSink for ChainLink<'_, '_> {
    fn write(&mut self, chunk: &[u8]) -> Result<(), Error> {
        match self.rest.split_last_mut() {
            Some((top, rest)) => top.filter.do_write(chunk, &mut ChainLink { rest, sink: &mut *self.sink }),
            None => self.sink.write(chunk),
        }
    }

    fn flush(&mut self) -> Result<(), Error> {
        match self.rest.split_last_mut() {
            Some((top, rest)) => top.filter.flush(&mut ChainLink { rest, sink: &mut *self.sink }),
            None => self.sink.flush(),
        }
    }

    fn end(&mut self) -> Result<(), Error> {
        match self.rest.split_last_mut() {
            Some((top, rest)) => top.filter.end(&mut ChainLink { rest, sink: &mut *self.sink }),
            None => self.sink.end(),
        }
    }
}
