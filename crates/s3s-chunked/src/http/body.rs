//! aws-chunked body

use super::AwsChunkedReader;

use crate::error::AwsChunkedError;
use crate::stream::{ByteSource, ByteStream, RemainingLength};
use crate::utils::BoxFuture;

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::Stream;
use http_body::{Frame, SizeHint};
use transform_stream::AsyncTryStream;

/// Encoded aws-chunked request body
///
/// Yields one framed chunk per item. Dropping the body before the end cancels the upstream source.
pub struct AwsChunkedBody {
    inner: AsyncTryStream<Bytes, AwsChunkedError, BoxFuture<'static, Result<(), AwsChunkedError>>>,

    /// `None` when the encoded length is unknown
    remaining_length: Option<u64>,
}

impl fmt::Debug for AwsChunkedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsChunkedBody")
            .field("remaining_length", &self.remaining_length)
            .finish_non_exhaustive()
    }
}

impl AwsChunkedBody {
    /// Wraps an encoder whose total output is `encoded_length` bytes, if known
    pub fn new<S>(mut reader: AwsChunkedReader<S>, encoded_length: Option<u64>) -> Self
    where
        S: ByteSource + 'static,
    {
        let inner = AsyncTryStream::<_, _, BoxFuture<'static, Result<(), AwsChunkedError>>>::new(|mut y| {
            Box::pin(async move {
                while let Some(frame) = reader.next_frame().await? {
                    y.yield_ok(frame).await;
                }
                Ok(())
            })
        });
        Self {
            inner,
            remaining_length: encoded_length,
        }
    }

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes, AwsChunkedError>>> {
        let ans = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(Some(Ok(ref bytes))) = ans
            && let Some(remaining) = self.remaining_length.as_mut()
        {
            *remaining = remaining.saturating_sub(bytes.len() as u64);
        }
        ans
    }

    /// Remaining encoded length, if known
    #[must_use]
    pub fn exact_remaining_length(&self) -> Option<u64> {
        self.remaining_length
    }
}

impl Stream for AwsChunkedBody {
    type Item = Result<Bytes, AwsChunkedError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.poll(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}

impl ByteStream for AwsChunkedBody {
    fn remaining_length(&self) -> RemainingLength {
        match self.remaining_length {
            Some(n) => RemainingLength::new_exact(n),
            None => RemainingLength::unknown(),
        }
    }
}

impl http_body::Body for AwsChunkedBody {
    type Data = Bytes;
    type Error = AwsChunkedError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.poll(cx).map(|ans| ans.map(|res| res.map(Frame::data)))
    }

    fn size_hint(&self) -> SizeHint {
        match self.remaining_length {
            Some(n) => SizeHint::with_exact(n),
            None => SizeHint::default(),
        }
    }
}
