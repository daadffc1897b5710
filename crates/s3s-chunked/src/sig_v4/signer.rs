//! Chunk signer seam of the aws-chunked encoder

use super::AmzDate;
use super::methods::{calculate_signature, create_chunk_string_to_sign, create_trailer_string_to_sign};

use crate::auth::SecretKey;
use crate::error::StdError;
use crate::http::TrailingHeaders;

use std::fmt;

use bytes::Bytes;
use subtle::ConstantTimeEq;

/// An opaque chunk or trailer signature
///
/// The SigV4 signer produces 64 bytes of lowercase hex.
/// A seed signature may be empty.
#[derive(Clone, Default)]
pub struct Signature(Bytes);

impl Signature {
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref().ct_eq(other.0.as_ref()).into()
    }
}

impl Eq for Signature {}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl From<String> for Signature {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&'static str> for Signature {
    fn from(value: &'static str) -> Self {
        Self(Bytes::from_static(value.as_bytes()))
    }
}

impl From<Bytes> for Signature {
    fn from(value: Bytes) -> Self {
        Self(value)
    }
}

/// Scope and credentials of a signed stream
#[derive(Debug, Clone)]
pub struct SigningConfig {
    pub amz_date: AmzDate,
    pub region: Box<str>,
    pub service: Box<str>,
    pub secret_key: SecretKey,
}

impl SigningConfig {
    #[must_use]
    pub fn new(amz_date: AmzDate, region: impl Into<Box<str>>, service: impl Into<Box<str>>, secret_key: impl Into<SecretKey>) -> Self {
        Self {
            amz_date,
            region: region.into(),
            service: service.into(),
            secret_key: secret_key.into(),
        }
    }
}

/// Computes the next link of a signature chain
///
/// Implementations must be deterministic for the same inputs.
/// The encoder calls them strictly one at a time per stream.
#[async_trait::async_trait]
pub trait ChunkSigner: Send + Sync + 'static {
    /// Signs one chunk body given the signature of the previous chunk (or the seed).
    async fn sign_chunk(&self, chunk: &[u8], prev_signature: &Signature, config: &SigningConfig) -> Result<Signature, StdError>;

    /// Signs the trailer block given the signature of the final chunk.
    async fn sign_trailer(
        &self,
        trailers: &TrailingHeaders,
        prev_signature: &Signature,
        config: &SigningConfig,
    ) -> Result<Signature, StdError>;

    /// Length of every signature this signer produces, if fixed.
    ///
    /// Required to precompute the encoded length of a signed body.
    fn signature_len(&self) -> Option<usize> {
        None
    }
}

/// HMAC-SHA256 chunk signer
#[derive(Debug, Default, Clone, Copy)]
pub struct SigV4ChunkSigner;

/// Length of a hex-encoded HMAC-SHA256 signature
const SIGV4_SIGNATURE_LEN: usize = 64;

#[async_trait::async_trait]
impl ChunkSigner for SigV4ChunkSigner {
    async fn sign_chunk(&self, chunk: &[u8], prev_signature: &Signature, config: &SigningConfig) -> Result<Signature, StdError> {
        let string_to_sign =
            create_chunk_string_to_sign(&config.amz_date, &config.region, &config.service, prev_signature.as_bytes(), chunk);
        let signature =
            calculate_signature(&string_to_sign, &config.secret_key, &config.amz_date, &config.region, &config.service);
        Ok(signature.into())
    }

    async fn sign_trailer(
        &self,
        trailers: &TrailingHeaders,
        prev_signature: &Signature,
        config: &SigningConfig,
    ) -> Result<Signature, StdError> {
        let canonical_trailers = trailers.to_canonical_bytes();
        let string_to_sign = create_trailer_string_to_sign(
            &config.amz_date,
            &config.region,
            &config.service,
            prev_signature.as_bytes(),
            &canonical_trailers,
        );
        let signature =
            calculate_signature(&string_to_sign, &config.secret_key, &config.amz_date, &config.region, &config.service);
        Ok(signature.into())
    }

    fn signature_len(&self) -> Option<usize> {
        Some(SIGV4_SIGNATURE_LEN)
    }
}
