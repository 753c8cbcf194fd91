//! HTTP Header Multimap.
pub mod error;
mod name;
mod value;
mod map;

pub use name::{HeaderName, AsHeaderName, standard};
pub use value::HeaderValue;
pub use map::{HeaderMap, HeaderField, Iter};

#[cfg(test)]
mod test;
