use super::{OutputFilter, OutputSink, ResponseInfo};
use crate::error::Error;

/// Passes body bytes through, dropping anything past the declared content length.
#[derive(Debug, Default)]
pub struct IdentityFilter {
    remaining: Option<u64>,
}

impl OutputFilter for IdentityFilter {
    fn set_response(&mut self, info: &ResponseInfo) {
        self.remaining = info.content_length;
    }

    fn do_write(&mut self, chunk: &[u8], next: &mut dyn OutputSink) -> Result<(), Error> {
        let chunk = match &mut self.remaining {
            Some(remaining) => {
                let cnt = (*remaining).min(chunk.len() as u64);
                *remaining -= cnt;
                &chunk[..cnt as usize]
            }
            None => chunk,
        };
        if chunk.is_empty() {
            return Ok(());
        }
        next.write(chunk)
    }

    fn recycle(&mut self) {
        self.remaining = None;
    }
}
