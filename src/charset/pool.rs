use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Charset, Decoder, Encoder};

/// Reusable converters, keyed by charset.
///
/// A pool is created with the server and shared by its connections. Each charset keeps a stack
/// of idle converters, at most `max_idle` deep, guarded by a mutex so connections on different
/// threads can take and return converters concurrently.
#[derive(Debug)]
pub struct ConverterPool {
    decoders: Mutex<HashMap<Charset, Vec<Decoder>>>,
    encoders: Mutex<HashMap<Charset, Vec<Encoder>>>,
    max_idle: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // converters hold no invariant a panicking holder could break
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConverterPool {
    pub fn new(max_idle: usize) -> Self {
        Self {
            decoders: Mutex::new(HashMap::new()),
            encoders: Mutex::new(HashMap::new()),
            max_idle,
        }
    }

    /// Take an idle decoder for `charset`, or create one.
    pub fn take_decoder(&self, charset: Charset) -> Decoder {
        lock(&self.decoders)
            .get_mut(&charset)
            .and_then(Vec::pop)
            .unwrap_or_else(|| Decoder::new(charset))
    }

    /// Return a decoder, it is reset before being stored.
    pub fn put_decoder(&self, mut decoder: Decoder) {
        decoder.reset();
        let mut map = lock(&self.decoders);
        let stack = map.entry(decoder.charset()).or_default();
        if stack.len() < self.max_idle {
            stack.push(decoder);
        }
    }

    /// Take an idle encoder for `charset`, or create one.
    pub fn take_encoder(&self, charset: Charset) -> Encoder {
        lock(&self.encoders)
            .get_mut(&charset)
            .and_then(Vec::pop)
            .unwrap_or_else(|| Encoder::new(charset))
    }

    /// Return an encoder, it is reset before being stored.
    pub fn put_encoder(&self, mut encoder: Encoder) {
        encoder.reset();
        let mut map = lock(&self.encoders);
        let stack = map.entry(encoder.charset()).or_default();
        if stack.len() < self.max_idle {
            stack.push(encoder);
        }
    }

    /// Number of idle decoders and encoders held for `charset`.
    pub fn idle(&self, charset: Charset) -> (usize, usize) {
        let decoders = lock(&self.decoders).get(&charset).map_or(0, Vec::len);
        let encoders = lock(&self.encoders).get(&charset).map_or(0, Vec::len);
        (decoders, encoders)
    }

    /// Drop every idle converter.
    pub fn clear(&self) {
        lock(&self.decoders).clear();
        lock(&self.encoders).clear();
    }
}

impl Default for ConverterPool {
    fn default() -> Self {
        Self::new(32)
    }
}
