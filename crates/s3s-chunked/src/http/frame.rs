//! aws-chunked wire framing
//!
//! ```text
//! <hex(len)>;chunk-signature=<sig>\r\n
//! <chunk bytes>\r\n
//! ...
//! 0;chunk-signature=<sig>\r\n
//! \r\n
//! <trailer-name>:<value1,value2>\r\n
//! x-amz-trailer-signature:<sig>\r\n
//! ```
//!
//! Unsigned framing omits every `;chunk-signature=` annotation and the `x-amz-trailer-signature` line.

use super::TrailingHeaders;

use crate::header::X_AMZ_TRAILER_SIGNATURE;
use crate::sig_v4::Signature;
use crate::utils::hex_len;

use bytes::{BufMut, Bytes, BytesMut};

const CHUNK_SIGNATURE_EXT: &[u8] = b";chunk-signature=";
const CRLF: &[u8] = b"\r\n";

/// Frames one chunk: size line, body and the terminating CRLF
#[must_use]
pub fn frame_chunk(body: &[u8], signature: Option<&Signature>) -> Bytes {
    let mut buf = BytesMut::with_capacity(chunk_frame_len(body.len(), signature.map(Signature::len)));
    write_chunk(&mut buf, body, signature);
    buf.freeze()
}

pub(crate) fn write_chunk(buf: &mut BytesMut, body: &[u8], signature: Option<&Signature>) {
    buf.put_slice(format!("{:x}", body.len()).as_bytes());
    if let Some(signature) = signature {
        buf.put_slice(CHUNK_SIGNATURE_EXT);
        buf.put_slice(signature.as_bytes());
    }
    buf.put_slice(CRLF);
    buf.put_slice(body);
    buf.put_slice(CRLF);
}

/// Frames the trailer block that follows the final chunk
///
/// No blank line is appended after the block.
#[must_use]
pub fn frame_trailers(trailers: &TrailingHeaders, signature: Option<&Signature>) -> Bytes {
    let mut buf = BytesMut::with_capacity(trailers_frame_len(trailers, signature.map(Signature::len)));
    write_trailers(&mut buf, trailers, signature);
    buf.freeze()
}

pub(crate) fn write_trailers(buf: &mut BytesMut, trailers: &TrailingHeaders, signature: Option<&Signature>) {
    for (name, value) in trailers.iter() {
        buf.put_slice(name.as_bytes());
        buf.put_u8(b':');
        buf.put_slice(value.as_bytes());
        buf.put_slice(CRLF);
    }
    if let Some(signature) = signature {
        buf.put_slice(X_AMZ_TRAILER_SIGNATURE.as_bytes());
        buf.put_u8(b':');
        buf.put_slice(signature.as_bytes());
        buf.put_slice(CRLF);
    }
}

/// Length of [`frame_chunk`] output for a body of `body_len` bytes
#[must_use]
pub const fn chunk_frame_len(body_len: usize, signature_len: Option<usize>) -> usize {
    let ext = match signature_len {
        Some(n) => CHUNK_SIGNATURE_EXT.len() + n,
        None => 0,
    };
    hex_len(body_len) + ext + CRLF.len() + body_len + CRLF.len()
}

/// Length of [`frame_trailers`] output
#[must_use]
pub fn trailers_frame_len(trailers: &TrailingHeaders, signature_len: Option<usize>) -> usize {
    let lines: usize = trailers.iter().map(|(name, value)| trailer_line_len(name, value.len())).sum();
    lines + signature_len.map_or(0, |n| trailer_line_len(X_AMZ_TRAILER_SIGNATURE, n))
}

pub(crate) const fn trailer_line_len(name: &str, value_len: usize) -> usize {
    name.len() + 1 + value_len + CRLF.len()
}

/// Byte layout of an encoded stream, used to precompute its length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedLayout {
    /// Size of every data chunk except the last one
    pub chunk_size: usize,
    /// Signature length, `None` for unsigned framing
    pub signature_len: Option<usize>,
    /// Length of the trailer lines, excluding the trailer signature line
    pub trailer_lines_len: usize,
}

impl EncodedLayout {
    /// Total number of encoded bytes for a payload of `decoded_len` bytes
    ///
    /// Returns `None` if `chunk_size` is zero or the total overflows `u64`.
    #[must_use]
    pub fn encoded_length(&self, decoded_len: u64) -> Option<u64> {
        let chunk_size = u64::try_from(self.chunk_size).ok().filter(|&n| n > 0)?;
        let full_chunks = decoded_len / chunk_size;
        let rest = usize::try_from(decoded_len % chunk_size).ok()?;

        let full = u64::try_from(chunk_frame_len(self.chunk_size, self.signature_len)).ok()?;
        let mut total = full_chunks.checked_mul(full)?;
        if rest > 0 {
            total = total.checked_add(u64::try_from(chunk_frame_len(rest, self.signature_len)).ok()?)?;
        }

        let mut tail = chunk_frame_len(0, self.signature_len);
        if self.trailer_lines_len > 0 {
            tail += self.trailer_lines_len;
            if let Some(n) = self.signature_len {
                tail += trailer_line_len(X_AMZ_TRAILER_SIGNATURE, n);
            }
        }
        total.checked_add(u64::try_from(tail).ok()?)
    }
}
