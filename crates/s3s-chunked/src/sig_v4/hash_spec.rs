//! Streaming values of `x-amz-content-sha256`

use crate::error::ConfigError;

use std::fmt;
use std::str::FromStr;

/// Selects whether chunk signatures are computed and whether trailers follow the body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashSpecification {
    /// `STREAMING-AWS4-HMAC-SHA256-PAYLOAD`
    StreamingAws4HmacSha256Payload,
    /// `STREAMING-AWS4-HMAC-SHA256-PAYLOAD-TRAILER`
    StreamingAws4HmacSha256PayloadTrailer,
    /// `STREAMING-UNSIGNED-PAYLOAD-TRAILER`
    StreamingUnsignedPayloadTrailer,
}

impl HashSpecification {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StreamingAws4HmacSha256Payload => "STREAMING-AWS4-HMAC-SHA256-PAYLOAD",
            Self::StreamingAws4HmacSha256PayloadTrailer => "STREAMING-AWS4-HMAC-SHA256-PAYLOAD-TRAILER",
            Self::StreamingUnsignedPayloadTrailer => "STREAMING-UNSIGNED-PAYLOAD-TRAILER",
        }
    }

    /// Whether every chunk carries a `chunk-signature`
    #[must_use]
    pub const fn is_signed(self) -> bool {
        !matches!(self, Self::StreamingUnsignedPayloadTrailer)
    }

    /// Whether trailing headers may follow the final chunk
    #[must_use]
    pub const fn has_trailer(self) -> bool {
        !matches!(self, Self::StreamingAws4HmacSha256Payload)
    }
}

impl fmt::Display for HashSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashSpecification {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STREAMING-AWS4-HMAC-SHA256-PAYLOAD" => Ok(Self::StreamingAws4HmacSha256Payload),
            "STREAMING-AWS4-HMAC-SHA256-PAYLOAD-TRAILER" => Ok(Self::StreamingAws4HmacSha256PayloadTrailer),
            "STREAMING-UNSIGNED-PAYLOAD-TRAILER" => Ok(Self::StreamingUnsignedPayloadTrailer),
            _ => Err(ConfigError::InvalidHashSpecification(s.to_owned())),
        }
    }
}
