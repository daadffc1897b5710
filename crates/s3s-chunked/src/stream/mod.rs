//! Byte sources and streams

mod source;
pub use self::source::{ChannelSource, ReaderSource, StreamSource, channel};

use crate::error::StdError;

use std::fmt;

use bytes::{Bytes, BytesMut};
use futures::Stream;

/// A stream of bytes that may know how much is left
pub trait ByteStream: Stream {
    fn remaining_length(&self) -> RemainingLength {
        RemainingLength::unknown()
    }
}

/// Bounds of the remaining length of a [`ByteStream`]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RemainingLength {
    lower: u64,
    upper: Option<u64>,
}

impl RemainingLength {
    /// Creates a new `RemainingLength` with the given lower and upper bounds.
    ///
    /// # Panics
    /// This function asserts that `lower <= upper`.
    #[must_use]
    pub fn new(lower: u64, upper: Option<u64>) -> Self {
        if let Some(upper) = upper {
            assert!(lower <= upper);
        }
        Self { lower, upper }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self { lower: 0, upper: None }
    }

    #[must_use]
    pub fn new_exact(n: u64) -> Self {
        Self {
            lower: n,
            upper: Some(n),
        }
    }

    #[must_use]
    pub fn exact(&self) -> Option<u64> {
        self.upper.filter(|&upper| upper == self.lower)
    }

    #[must_use]
    pub fn lower(&self) -> u64 {
        self.lower
    }

    #[must_use]
    pub fn upper(&self) -> Option<u64> {
        self.upper
    }
}

impl fmt::Debug for RemainingLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(exact) = self.exact() {
            return write!(f, "{exact}");
        }
        match self.upper {
            Some(upper) => write!(f, "({}..={})", self.lower, upper),
            None => write!(f, "({}..)", self.lower),
        }
    }
}

/// Upstream of an aws-chunked encoder
///
/// The encoder reads a source sequentially and never concurrently.
#[async_trait::async_trait]
pub trait ByteSource: Send {
    /// Appends at most `limit` bytes to `buf`
    ///
    /// Waits until at least one byte is available.
    /// Returns `Ok(None)` once the source is exhausted.
    async fn read(&mut self, buf: &mut BytesMut, limit: usize) -> Result<Option<usize>, StdError>;

    /// Whether every later [`ByteSource::read`] would return `Ok(None)`
    fn is_closed_for_read(&self) -> bool;

    /// Stops the source and releases its resources
    ///
    /// Called when the encoder is cancelled, dropped early or fails.
    fn cancel(&mut self) {}
}

#[async_trait::async_trait]
impl ByteSource for Bytes {
    async fn read(&mut self, buf: &mut BytesMut, limit: usize) -> Result<Option<usize>, StdError> {
        if self.is_empty() {
            return Ok(None);
        }
        let n = limit.min(self.len());
        buf.extend_from_slice(&self.split_to(n));
        Ok(Some(n))
    }

    fn is_closed_for_read(&self) -> bool {
        self.is_empty()
    }

    fn cancel(&mut self) {
        self.clear();
    }
}

#[async_trait::async_trait]
impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    async fn read(&mut self, buf: &mut BytesMut, limit: usize) -> Result<Option<usize>, StdError> {
        (**self).read(buf, limit).await
    }

    fn is_closed_for_read(&self) -> bool {
        (**self).is_closed_for_read()
    }

    fn cancel(&mut self) {
        (**self).cancel();
    }
}
