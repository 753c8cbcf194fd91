use super::{AsHeaderName, HeaderName, HeaderValue};

/// A header name and its value.
#[derive(Clone, Debug)]
pub struct HeaderField {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderField {
    #[inline]
    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    #[inline]
    pub fn value(&self) -> &HeaderValue {
        &self.value
    }

    #[inline]
    pub fn value_mut(&mut self) -> &mut HeaderValue {
        &mut self.value
    }

    fn is(&self, name: &str) -> bool {
        self.name.as_str().eq_ignore_ascii_case(name)
    }
}

/// HTTP Headers Multimap.
///
/// Fields are kept in insertion order, lookups ignore ASCII case. Clearing the map keeps its
/// allocation for the next message on the connection.
#[derive(Clone, Debug, Default)]
pub struct HeaderMap {
    fields: Vec<HeaderField>,
}

impl HeaderMap {
    /// Create new empty [`HeaderMap`].
    ///
    /// This function does not allocate.
    #[inline]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { fields: Vec::with_capacity(capacity) }
    }

    /// Returns number of fields, repeated names counted once per value.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    // ===== Lookup =====

    /// Returns `true` if the map contains a header value for given header name.
    #[inline]
    pub fn contains_key<K: AsHeaderName>(&self, name: K) -> bool {
        self.get(name).is_some()
    }

    /// Returns a reference to the first header value corresponding to the given header name.
    pub fn get<K: AsHeaderName>(&self, name: K) -> Option<&HeaderValue> {
        let name = name.as_header_str();
        self.fields.iter().find(|f| f.is(name)).map(HeaderField::value)
    }

    /// Returns a mutable reference to the first header value corresponding to the given name.
    pub fn get_mut<K: AsHeaderName>(&mut self, name: K) -> Option<&mut HeaderValue> {
        let name = name.as_header_str();
        self.fields.iter_mut().find(|f| f.is(name)).map(HeaderField::value_mut)
    }

    /// Returns an iterator to all header values corresponding to the given header name.
    pub fn get_all<K: AsHeaderName>(&self, name: K) -> impl Iterator<Item = &HeaderValue> {
        self.fields
            .iter()
            .filter(move |f| f.is(name.as_header_str()))
            .map(HeaderField::value)
    }

    /// Returns an iterator over headers as name and value pair.
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter { inner: self.fields.iter() }
    }

    // ===== Mutation =====

    /// Insert a header, replacing every value previously stored under the same name.
    ///
    /// Returns the first replaced value.
    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) -> Option<HeaderValue> {
        let old = self.remove(&name);
        self.fields.push(HeaderField { name, value });
        old
    }

    /// Append a header, keeping previously stored values of the same name.
    #[inline]
    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        self.fields.push(HeaderField { name, value });
    }

    /// Removes every value of a header, returning the first one.
    pub fn remove<K: AsHeaderName>(&mut self, name: K) -> Option<HeaderValue> {
        let name = name.as_header_str();
        let mut first = None;
        let mut index = 0;
        while index < self.fields.len() {
            if self.fields[index].is(name) {
                let field = self.fields.remove(index);
                first.get_or_insert(field.value);
            } else {
                index += 1;
            }
        }
        first
    }

    /// Removes the most recently appended field.
    pub fn pop(&mut self) -> Option<HeaderField> {
        self.fields.pop()
    }

    /// Removes all headers, keeping the allocated memory.
    #[inline]
    pub fn clear(&mut self) {
        self.fields.clear();
    }
}

/// Iterator over [`HeaderMap`] fields, in insertion order.
#[derive(Debug)]
pub struct Iter<'a> {
    inner: std::slice::Iter<'a, HeaderField>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a HeaderName, &'a HeaderValue);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|f| (&f.name, &f.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = (&'a HeaderName, &'a HeaderValue);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
