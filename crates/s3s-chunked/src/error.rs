use crate::sig_v4::HashSpecification;

pub type StdError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Runtime error of an aws-chunked encoder.
///
/// Every variant is fatal for the stream that produced it.
/// The encoder must be discarded and the upload restarted with a fresh seed signature.
#[derive(Debug, thiserror::Error)]
pub enum AwsChunkedError {
    /// The upstream byte source failed
    #[error("AwsChunkedError: Upstream: {}", .0)]
    Upstream(StdError),
    /// The chunk signer failed
    #[error("AwsChunkedError: Signing: {}", .0)]
    Signing(StdError),
    /// The stream was already terminated by an earlier error or by cancellation
    #[error("AwsChunkedError: Terminated")]
    Terminated,
}

/// Construction-time error of an aws-chunked encoder.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ConfigError: chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("ConfigError: aws-chunked threshold {threshold} is smaller than the chunk size {chunk_size}")]
    ThresholdTooSmall { threshold: u64, chunk_size: usize },

    #[error("ConfigError: {0} requires a chunk signer")]
    MissingSigner(HashSpecification),

    #[error("ConfigError: {0} does not sign chunks")]
    UnexpectedSigner(HashSpecification),

    #[error("ConfigError: {0} does not carry trailing headers")]
    TrailersNotSupported(HashSpecification),

    #[error("ConfigError: trailer name {0:?} is reserved")]
    ReservedTrailer(String),

    #[error("ConfigError: invalid trailer name {0:?}")]
    InvalidTrailerName(String),

    #[error("ConfigError: invalid value for trailer {0:?}")]
    InvalidTrailerValue(String),

    #[error("ConfigError: invalid value for header {0:?}")]
    InvalidHeaderValue(String),

    #[error("ConfigError: unknown checksum algorithm {0:?}")]
    InvalidChecksumAlgorithm(String),

    #[error("ConfigError: invalid hash specification {0:?}")]
    InvalidHashSpecification(String),

    #[error("ConfigError: invalid x-amz-date {0:?}")]
    InvalidAmzDate(String),
}
