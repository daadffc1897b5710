//! Trailing headers of an aws-chunked body

use crate::error::ConfigError;
use crate::header::X_AMZ_TRAILER_SIGNATURE;

use http::{HeaderMap, HeaderName, HeaderValue};
use smallvec::SmallVec;

/// Trailing headers, kept in ascending order of their lowercase names
///
/// Values are trimmed on insertion. Several values of one name are joined with `,` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrailingHeaders {
    entries: Vec<(HeaderName, SmallVec<[Box<str>; 1]>)>,
}

impl TrailingHeaders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value to a trailer
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the name is invalid or reserved, or if the value is not a valid header value
    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| ConfigError::InvalidTrailerName(name.to_owned()))?;
        if name.as_str() == X_AMZ_TRAILER_SIGNATURE {
            return Err(ConfigError::ReservedTrailer(name.as_str().to_owned()));
        }
        let value = value.trim();
        if HeaderValue::from_str(value).is_err() {
            return Err(ConfigError::InvalidTrailerValue(name.as_str().to_owned()));
        }
        self.push(name, value.into());
        Ok(())
    }

    fn push(&mut self, name: HeaderName, value: Box<str>) {
        let idx = self.entries.partition_point(|(n, _)| n.as_str() < name.as_str());
        if self.entries.get(idx).is_some_and(|(n, _)| *n == name) {
            self.entries[idx].1.push(value);
        } else {
            self.entries.insert(idx, (name, smallvec::smallvec![value]));
        }
    }

    /// Builds trailers from a header map
    ///
    /// # Errors
    /// Returns [`ConfigError`] if any entry is reserved or has a non-visible-ASCII value
    pub fn from_header_map(map: &HeaderMap) -> Result<Self, ConfigError> {
        let mut ans = Self::new();
        for (name, value) in map {
            let value = value
                .to_str()
                .map_err(|_| ConfigError::InvalidTrailerValue(name.as_str().to_owned()))?;
            ans.insert(name.as_str(), value)?;
        }
        Ok(ans)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct trailer names
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[Box<str>]> {
        let name = name.to_ascii_lowercase();
        let idx = self.entries.partition_point(|(n, _)| n.as_str() < name.as_str());
        match self.entries.get(idx) {
            Some((n, values)) if n.as_str() == name => Some(values.as_slice()),
            _ => None,
        }
    }

    /// Iterates over `(name, joined values)` in ascending name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.entries.iter().map(|(n, values)| (n.as_str(), values.join(",")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// `name:value\n` lines, the input of the trailer signature
    #[must_use]
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut ans = Vec::new();
        for (name, value) in self.iter() {
            ans.extend_from_slice(name.as_bytes());
            ans.push(b':');
            ans.extend_from_slice(value.as_bytes());
            ans.push(b'\n');
        }
        ans
    }

    pub(crate) fn insert_unchecked(&mut self, name: &'static str, value: String) {
        self.push(HeaderName::from_static(name), value.into_boxed_str());
    }
}
