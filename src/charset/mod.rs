//! Character sets for request and response bodies.
//!
//! Header bytes are always read as ISO-8859-1, bodies use the charset declared by the message
//! or the configured fallback. Conversion state lives in [`Decoder`] and [`Encoder`], which are
//! recycled through a [`ConverterPool`].
mod codec;
mod pool;

pub use codec::{Decoder, Encoder, REPLACEMENT};
pub use pool::ConverterPool;

/// A supported character set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Charset {
    /// `UTF-8`
    Utf8,
    /// `ISO-8859-1`
    Latin1,
    /// `US-ASCII`
    Ascii,
}

impl Charset {
    /// Resolve a charset label, e.g. `utf-8` or `"ISO-8859-1"`.
    ///
    /// Labels are matched case-insensitively, surrounding quotes and whitespace are ignored.
    pub fn for_label(label: &str) -> Option<Charset> {
        let label = label.trim().trim_matches('"').trim();
        const LABELS: &[(&str, Charset)] = &[
            ("utf-8", Charset::Utf8),
            ("utf8", Charset::Utf8),
            ("iso-8859-1", Charset::Latin1),
            ("iso8859-1", Charset::Latin1),
            ("iso_8859-1", Charset::Latin1),
            ("latin1", Charset::Latin1),
            ("l1", Charset::Latin1),
            ("us-ascii", Charset::Ascii),
            ("ascii", Charset::Ascii),
        ];
        LABELS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(label))
            .map(|(_, charset)| *charset)
    }

    /// Resolve an optionally declared charset, falling back when absent or unknown.
    pub fn resolve(declared: Option<&str>, fallback: Charset) -> Charset {
        declared.and_then(Charset::for_label).unwrap_or(fallback)
    }

    /// Canonical name, as written in a `Content-Type` parameter.
    pub const fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Ascii => "US-ASCII",
        }
    }

    /// Upper bound of encoded bytes for a single character.
    pub const fn max_bytes_per_char(&self) -> usize {
        match self {
            Charset::Utf8 => 4,
            Charset::Latin1 | Charset::Ascii => 1,
        }
    }
}

impl Default for Charset {
    #[inline]
    fn default() -> Self {
        Charset::Latin1
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decode bytes as ISO-8859-1, where every byte maps to the code point of the same value.
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Extract the `charset` parameter of a media type, e.g. `text/plain; charset=utf-8`.
pub fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

#[cfg(test)]
mod test;
