//! aws-chunked encoder state machine

use super::body::AwsChunkedBody;
use super::frame::{EncodedLayout, chunk_frame_len, trailer_line_len, trailers_frame_len, write_chunk, write_trailers};
use super::TrailingHeaders;

use crate::config::{ChunkedConfig, ChunkedConfigProvider};
use crate::crypto::{ChecksumAlgorithm, ChecksumHasher};
use crate::error::{AwsChunkedError, ConfigError};
use crate::header;
use crate::sig_v4::{ChunkSigner, HashSpecification, Signature, SigningConfig};
use crate::stream::ByteSource;

use std::fmt;
use std::mem;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderValue};
use tracing::{debug, trace};

/// Progress of an encoded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// More data chunks may follow
    Streaming,
    /// Upstream is exhausted, the final chunk has not been produced yet
    LastChunkPending,
    /// The final chunk and trailers have been produced
    LastChunkSent,
}

struct ChunkSigning {
    signer: Arc<dyn ChunkSigner>,
    config: SigningConfig,
}

/// Builder of [`AwsChunkedReader`] and [`AwsChunkedBody`]
///
/// All configuration errors are reported by [`AwsChunkedBuilder::build`], before any byte is read.
pub struct AwsChunkedBuilder {
    spec: HashSpecification,
    config: Arc<ChunkedConfig>,
    signing: Option<(ChunkSigning, Signature)>,
    trailers: TrailingHeaders,
    checksum: Option<ChecksumAlgorithm>,
}

impl fmt::Debug for AwsChunkedBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsChunkedBuilder")
            .field("spec", &self.spec)
            .field("config", &self.config)
            .field("signed", &self.signing.is_some())
            .field("trailers", &self.trailers)
            .field("checksum", &self.checksum)
            .finish()
    }
}

impl AwsChunkedBuilder {
    #[must_use]
    pub fn new(spec: HashSpecification) -> Self {
        Self {
            spec,
            config: Arc::new(ChunkedConfig::default()),
            signing: None,
            trailers: TrailingHeaders::new(),
            checksum: None,
        }
    }

    #[must_use]
    pub fn config(mut self, config: Arc<ChunkedConfig>) -> Self {
        self.config = config;
        self
    }

    /// Takes a snapshot of the provider's current configuration
    #[must_use]
    pub fn config_provider(self, provider: &dyn ChunkedConfigProvider) -> Self {
        self.config(provider.snapshot())
    }

    /// Overrides the chunk size of the configuration
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        let mut config = ChunkedConfig::clone(&self.config);
        config.chunk_size = chunk_size;
        self.config = Arc::new(config);
        self
    }

    /// Sets the signer, its scope and the seed signature that starts the chain
    #[must_use]
    pub fn signer(mut self, signer: Arc<dyn ChunkSigner>, config: SigningConfig, seed_signature: Signature) -> Self {
        self.signing = Some((ChunkSigning { signer, config }, seed_signature));
        self
    }

    #[must_use]
    pub fn trailers(mut self, trailers: TrailingHeaders) -> Self {
        self.trailers = trailers;
        self
    }

    /// Computes a checksum over the payload and sends it as a trailer
    #[must_use]
    pub fn checksum(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.checksum = Some(algorithm);
        self
    }

    #[must_use]
    pub fn hash_specification(&self) -> HashSpecification {
        self.spec
    }

    /// Checks the builder without consuming it
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the configuration cannot produce a valid stream
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate()?;

        match (self.spec.is_signed(), self.signing.is_some()) {
            (true, false) => return Err(ConfigError::MissingSigner(self.spec)),
            (false, true) => return Err(ConfigError::UnexpectedSigner(self.spec)),
            _ => {}
        }

        if !self.spec.has_trailer() && (!self.trailers.is_empty() || self.checksum.is_some()) {
            return Err(ConfigError::TrailersNotSupported(self.spec));
        }

        if let Some(algorithm) = self.checksum
            && self.trailers.contains(algorithm.header_name())
        {
            return Err(ConfigError::ReservedTrailer(algorithm.header_name().to_owned()));
        }

        Ok(())
    }

    fn trailer_lines_len(&self) -> usize {
        let checksum = self.checksum.map_or(0, |a| trailer_line_len(a.header_name(), a.encoded_len()));
        trailers_frame_len(&self.trailers, None) + checksum
    }

    /// Exact number of bytes the encoder emits for a payload of `decoded_len` bytes
    ///
    /// Returns `None` when the signer has no fixed signature length.
    #[must_use]
    pub fn encoded_length(&self, decoded_len: u64) -> Option<u64> {
        let signature_len = match &self.signing {
            Some((signing, _)) => Some(signing.signer.signature_len()?),
            None => None,
        };
        let layout = EncodedLayout {
            chunk_size: self.config.chunk_size,
            signature_len,
            trailer_lines_len: self.trailer_lines_len(),
        };
        layout.encoded_length(decoded_len)
    }

    fn trailer_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.trailers.names().collect();
        if let Some(algorithm) = self.checksum {
            names.push(algorithm.header_name());
            names.sort_unstable();
        }
        names
    }

    /// Sets the request headers that announce an aws-chunked body
    ///
    /// `content-length` is removed because the body is sent with `transfer-encoding: chunked`.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if an existing `content-encoding` value is not visible ASCII
    pub fn apply_headers(&self, headers: &mut HeaderMap, decoded_len: Option<u64>) -> Result<(), ConfigError> {
        let invalid_encoding = || ConfigError::InvalidHeaderValue(header::CONTENT_ENCODING.as_str().to_owned());
        let content_encoding = match headers.get(header::CONTENT_ENCODING) {
            None => HeaderValue::from_static(header::AWS_CHUNKED),
            Some(existing) => {
                let existing = existing.to_str().map_err(|_| invalid_encoding())?;
                let value = if existing.split(',').any(|token| token.trim() == header::AWS_CHUNKED) {
                    existing.to_owned()
                } else {
                    format!("{existing},{}", header::AWS_CHUNKED)
                };
                HeaderValue::try_from(value).map_err(|_| invalid_encoding())?
            }
        };
        headers.insert(header::CONTENT_ENCODING, content_encoding);
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.remove(header::CONTENT_LENGTH);
        headers.insert(header::X_AMZ_CONTENT_SHA256, HeaderValue::from_static(self.spec.as_str()));

        if let Some(len) = decoded_len {
            headers.insert(header::X_AMZ_DECODED_CONTENT_LENGTH, HeaderValue::from(len));
        }

        let names = self.trailer_names();
        if !names.is_empty() {
            let joined = names.join(",");
            let value = HeaderValue::try_from(joined)
                .map_err(|_| ConfigError::InvalidHeaderValue(header::X_AMZ_TRAILER.as_str().to_owned()))?;
            headers.insert(header::X_AMZ_TRAILER, value);
        }

        Ok(())
    }

    /// Builds the encoder
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the configuration cannot produce a valid stream
    pub fn build<S: ByteSource>(self, source: S) -> Result<AwsChunkedReader<S>, ConfigError> {
        self.validate()?;

        let (signing, prev_signature) = match self.signing {
            Some((signing, seed)) => (Some(signing), seed),
            None => (None, Signature::empty()),
        };

        debug!(spec = %self.spec, chunk_size = self.config.chunk_size, trailers = self.trailers.len(), "aws-chunked encoder built");

        Ok(AwsChunkedReader {
            source,
            signing,
            chunk_size: self.config.chunk_size,
            trailers: self.trailers,
            checksum: self.checksum.map(ChecksumAlgorithm::hasher),
            prev_signature,
            state: StreamState::Streaming,
            chunk: BytesMut::new(),
            encoded: Bytes::new(),
            terminated: false,
            producing: false,
        })
    }

    /// Builds the encoder wrapped as a body stream
    ///
    /// With `decoded_len`, the body reports its exact encoded length.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the configuration cannot produce a valid stream
    pub fn build_body<S: ByteSource + 'static>(self, source: S, decoded_len: Option<u64>) -> Result<AwsChunkedBody, ConfigError> {
        let encoded_len = decoded_len.and_then(|n| self.encoded_length(n));
        let reader = self.build(source)?;
        Ok(AwsChunkedBody::new(reader, encoded_len))
    }
}

/// aws-chunked encoder over an upstream [`ByteSource`]
///
/// Reads must be sequential. Every error is fatal for the stream.
/// Dropping an unfinished reader cancels the upstream source.
pub struct AwsChunkedReader<S: ByteSource> {
    source: S,
    signing: Option<ChunkSigning>,
    chunk_size: usize,
    trailers: TrailingHeaders,
    checksum: Option<ChecksumHasher>,

    /// The last link of the signature chain
    prev_signature: Signature,
    state: StreamState,

    /// Unsigned payload of the current chunk
    chunk: BytesMut,
    /// Framed bytes ready to be read
    encoded: Bytes,

    terminated: bool,
    /// Set while a chunk is being hashed and signed, cleared once it is framed
    producing: bool,
}

impl<S: ByteSource> fmt::Debug for AwsChunkedReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsChunkedReader")
            .field("state", &self.state)
            .field("signed", &self.signing.is_some())
            .field("chunk_size", &self.chunk_size)
            .field("buffered", &self.encoded.len())
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

impl<S: ByteSource> AwsChunkedReader<S> {
    /// Position in the chunk sequence
    ///
    /// Termination is reported separately by [`AwsChunkedReader::is_terminated`]: a failed or
    /// cancelled stream keeps the state it had when it stopped.
    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Whether the stream stopped on an error or a cancel and rejects every further read
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// The signature of the most recently signed chunk or trailer block, or the seed
    #[must_use]
    pub fn prev_signature(&self) -> &Signature {
        &self.prev_signature
    }

    /// Reads up to `limit` encoded bytes into `sink`
    ///
    /// Returns `Ok(None)` once the stream is exhausted, and on every later call.
    ///
    /// # Errors
    /// Returns [`AwsChunkedError`] if upstream or the signer fails, or if the stream was terminated before.
    pub async fn read(&mut self, sink: &mut BytesMut, limit: usize) -> Result<Option<usize>, AwsChunkedError> {
        if self.encoded.is_empty() && !self.fill().await? {
            return Ok(None);
        }
        let n = limit.min(self.encoded.len());
        sink.extend_from_slice(&self.encoded.split_to(n));
        Ok(Some(n))
    }

    /// Takes all encoded bytes that are ready, producing the next chunk if none are
    ///
    /// # Errors
    /// Same as [`AwsChunkedReader::read`]
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>, AwsChunkedError> {
        if self.encoded.is_empty() && !self.fill().await? {
            return Ok(None);
        }
        Ok(Some(mem::take(&mut self.encoded)))
    }

    /// Abandons the stream and cancels the upstream source
    ///
    /// The final chunk and trailers are never produced afterwards.
    pub fn cancel(&mut self) {
        if self.terminated {
            return;
        }
        if self.state != StreamState::LastChunkSent {
            debug!(state = ?self.state, "aws-chunked stream cancelled before the final chunk");
        }
        self.terminate();
    }

    fn terminate(&mut self) {
        self.terminated = true;
        self.chunk.clear();
        self.encoded.clear();
        self.source.cancel();
    }

    /// Produces the next framed chunk into the encoded buffer
    ///
    /// Returns `false` once nothing is left.
    async fn fill(&mut self) -> Result<bool, AwsChunkedError> {
        if self.terminated {
            return Err(AwsChunkedError::Terminated);
        }
        if self.producing {
            // A previous read was dropped while signing: the chunk it held is lost.
            debug!(state = ?self.state, "aws-chunked read interrupted while signing");
            self.terminate();
            return Err(AwsChunkedError::Terminated);
        }
        let result = self.produce().await;
        if let Err(ref err) = result {
            debug!(%err, state = ?self.state, "aws-chunked stream failed");
            self.terminate();
        }
        result
    }

    #[tracing::instrument(level = "trace", skip(self), fields(state = ?self.state))]
    async fn produce(&mut self) -> Result<bool, AwsChunkedError> {
        match self.state {
            StreamState::LastChunkSent => return Ok(false),
            StreamState::Streaming => {
                self.accumulate().await?;
                if !self.chunk.is_empty() {
                    self.producing = true;
                    let body = self.chunk.split().freeze();
                    self.produce_data_chunk(&body).await?;
                    self.producing = false;
                    return Ok(true);
                }
                trace!("upstream closed for read");
                self.state = StreamState::LastChunkPending;
            }
            StreamState::LastChunkPending => {}
        }
        self.producing = true;
        self.produce_final_chunk().await?;
        self.producing = false;
        Ok(true)
    }

    /// Reads upstream until a full chunk is buffered or upstream is closed
    async fn accumulate(&mut self) -> Result<(), AwsChunkedError> {
        self.chunk.reserve(self.chunk_size.saturating_sub(self.chunk.len()));
        while self.chunk.len() < self.chunk_size && !self.source.is_closed_for_read() {
            let limit = self.chunk_size - self.chunk.len();
            let n = self
                .source
                .read(&mut self.chunk, limit)
                .await
                .map_err(AwsChunkedError::Upstream)?;
            if n.is_none() {
                break;
            }
        }
        Ok(())
    }

    async fn produce_data_chunk(&mut self, body: &Bytes) -> Result<(), AwsChunkedError> {
        if let Some(hasher) = self.checksum.as_mut() {
            hasher.update(body);
        }
        let signature = self.sign_chunk(body).await?;

        let mut buf = BytesMut::with_capacity(chunk_frame_len(body.len(), signature.as_ref().map(Signature::len)));
        write_chunk(&mut buf, body, signature.as_ref());
        self.encoded = buf.freeze();

        trace!(size = body.len(), signed = signature.is_some(), "produced chunk");
        Ok(())
    }

    async fn produce_final_chunk(&mut self) -> Result<(), AwsChunkedError> {
        if let Some(hasher) = self.checksum.take() {
            let name = hasher.algorithm().header_name();
            self.trailers.insert_unchecked(name, hasher.finalize_base64());
        }

        let chunk_signature = self.sign_chunk(&[]).await?;
        let trailer_signature = if self.trailers.is_empty() {
            None
        } else {
            self.sign_trailers().await?
        };

        let mut buf = BytesMut::with_capacity(
            chunk_frame_len(0, chunk_signature.as_ref().map(Signature::len))
                + trailers_frame_len(&self.trailers, trailer_signature.as_ref().map(Signature::len)),
        );
        write_chunk(&mut buf, &[], chunk_signature.as_ref());
        if !self.trailers.is_empty() {
            write_trailers(&mut buf, &self.trailers, trailer_signature.as_ref());
        }
        self.encoded = buf.freeze();
        self.state = StreamState::LastChunkSent;

        debug!(trailers = self.trailers.len(), signed = chunk_signature.is_some(), "produced final chunk");
        Ok(())
    }

    /// Signs a chunk and advances the chain; `None` in unsigned mode
    async fn sign_chunk(&mut self, body: &[u8]) -> Result<Option<Signature>, AwsChunkedError> {
        let Some(signing) = &self.signing else { return Ok(None) };
        let signature = signing
            .signer
            .sign_chunk(body, &self.prev_signature, &signing.config)
            .await
            .map_err(AwsChunkedError::Signing)?;
        self.prev_signature = signature.clone();
        Ok(Some(signature))
    }

    async fn sign_trailers(&mut self) -> Result<Option<Signature>, AwsChunkedError> {
        let Some(signing) = &self.signing else { return Ok(None) };
        let signature = signing
            .signer
            .sign_trailer(&self.trailers, &self.prev_signature, &signing.config)
            .await
            .map_err(AwsChunkedError::Signing)?;
        self.prev_signature = signature.clone();
        Ok(Some(signature))
    }
}

impl<S: ByteSource> Drop for AwsChunkedReader<S> {
    fn drop(&mut self) {
        if !self.terminated && self.state != StreamState::LastChunkSent {
            self.cancel();
        }
    }
}
