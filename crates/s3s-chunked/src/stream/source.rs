use super::ByteSource;

use crate::error::StdError;

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

fn take_pending(pending: &mut Bytes, buf: &mut BytesMut, limit: usize) -> usize {
    let n = limit.min(pending.len());
    buf.extend_from_slice(&pending.split_to(n));
    n
}

/// [`ByteSource`] over a stream of byte buffers
pub struct StreamSource<S> {
    stream: Option<S>,
    pending: Bytes,
}

impl<S> fmt::Debug for StreamSource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSource")
            .field("pending", &self.pending.len())
            .field("closed", &self.stream.is_none())
            .finish()
    }
}

impl<S> StreamSource<S> {
    #[must_use]
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            pending: Bytes::new(),
        }
    }
}

#[async_trait::async_trait]
impl<S, E> ByteSource for StreamSource<S>
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin,
    E: Into<StdError> + Send,
{
    async fn read(&mut self, buf: &mut BytesMut, limit: usize) -> Result<Option<usize>, StdError> {
        loop {
            if !self.pending.is_empty() {
                return Ok(Some(take_pending(&mut self.pending, buf, limit)));
            }
            let Some(stream) = self.stream.as_mut() else { return Ok(None) };
            match stream.next().await {
                Some(Ok(bytes)) => self.pending = bytes,
                Some(Err(e)) => {
                    self.stream = None;
                    return Err(e.into());
                }
                None => {
                    self.stream = None;
                    return Ok(None);
                }
            }
        }
    }

    fn is_closed_for_read(&self) -> bool {
        self.pending.is_empty() && self.stream.is_none()
    }

    fn cancel(&mut self) {
        self.stream = None;
        self.pending.clear();
    }
}

/// Producer side of a [`ChannelSource`]
pub type ChannelSender = mpsc::Sender<Result<Bytes, StdError>>;

/// Creates a bounded channel whose receiving side is a [`ByteSource`]
///
/// Cancelling the source closes the channel, so the producer observes it on its next send.
#[must_use]
pub fn channel(capacity: usize) -> (ChannelSender, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity);
    let source = ChannelSource {
        rx,
        pending: Bytes::new(),
        closed: false,
    };
    (tx, source)
}

/// [`ByteSource`] fed through a tokio channel
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<Result<Bytes, StdError>>,
    pending: Bytes,
    closed: bool,
}

#[async_trait::async_trait]
impl ByteSource for ChannelSource {
    async fn read(&mut self, buf: &mut BytesMut, limit: usize) -> Result<Option<usize>, StdError> {
        loop {
            if !self.pending.is_empty() {
                return Ok(Some(take_pending(&mut self.pending, buf, limit)));
            }
            if self.closed {
                return Ok(None);
            }
            match self.rx.recv().await {
                Some(Ok(bytes)) => self.pending = bytes,
                Some(Err(e)) => {
                    self.cancel();
                    return Err(e);
                }
                None => {
                    self.closed = true;
                    return Ok(None);
                }
            }
        }
    }

    fn is_closed_for_read(&self) -> bool {
        self.pending.is_empty() && self.closed
    }

    fn cancel(&mut self) {
        self.rx.close();
        self.closed = true;
        self.pending.clear();
    }
}

/// [`ByteSource`] over an [`AsyncRead`]
pub struct ReaderSource<R> {
    reader: Option<R>,
}

impl<R> fmt::Debug for ReaderSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderSource").field("closed", &self.reader.is_none()).finish()
    }
}

impl<R> ReaderSource<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self { reader: Some(reader) }
    }
}

#[async_trait::async_trait]
impl<R> ByteSource for ReaderSource<R>
where
    R: AsyncRead + Send + Unpin,
{
    async fn read(&mut self, buf: &mut BytesMut, limit: usize) -> Result<Option<usize>, StdError> {
        let Some(reader) = self.reader.as_mut() else { return Ok(None) };
        let mut dst = (&mut *buf).limit(limit);
        let n = match reader.read_buf(&mut dst).await {
            Ok(n) => n,
            Err(e) => {
                self.reader = None;
                return Err(e.into());
            }
        };
        if n == 0 {
            self.reader = None;
            return Ok(None);
        }
        Ok(Some(n))
    }

    fn is_closed_for_read(&self) -> bool {
        self.reader.is_none()
    }

    fn cancel(&mut self) {
        self.reader = None;
    }
}
