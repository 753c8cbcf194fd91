use super::{OutputFilter, OutputSink};
use crate::error::Error;

/// Swallows the body, for HEAD responses and statuses that carry none.
#[derive(Debug, Default)]
pub struct VoidFilter;

impl OutputFilter for VoidFilter {
    fn do_write(&mut self, _: &[u8], _: &mut dyn OutputSink) -> Result<(), Error> {
        Ok(())
    }

    fn recycle(&mut self) { }
}
