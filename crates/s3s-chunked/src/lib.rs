//! aws-chunked streaming body encoder
//!
//! `s3s-chunked` turns an unsigned request body into the `aws-chunked` content encoding
//! used by streaming SigV4 uploads. Each chunk is signed with a signature that depends on the
//! signature of the previous chunk, starting from the seed signature of the request.
//!
//! # Wire format
//!
//! ```text
//! 10000;chunk-signature=<sig1>\r\n
//! <65536 bytes>\r\n
//! 400;chunk-signature=<sig2>\r\n
//! <1024 bytes>\r\n
//! 0;chunk-signature=<sig3>\r\n
//! \r\n
//! x-amz-checksum-crc32c:sOO8/Q==\r\n
//! x-amz-trailer-signature:<sig4>\r\n
//! ```
//!
//! `STREAMING-UNSIGNED-PAYLOAD-TRAILER` omits every signature and keeps the rest of the framing.
//!
//! # Components
//!
//! - [`frame_chunk`] and [`frame_trailers`]: pure framing functions
//! - [`ChunkSigner`]: the signing seam, with [`SigV4ChunkSigner`] as the HMAC-SHA256 implementation
//! - [`AwsChunkedReader`]: the encoder state machine over a [`ByteSource`](stream::ByteSource)
//! - [`AwsChunkedBody`]: the encoder as a `Stream` and an `http_body::Body`
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use bytes::{Bytes, BytesMut};
//! use s3s_chunked::{AmzDate, AwsChunkedBuilder, HashSpecification, SigV4ChunkSigner, Signature, SigningConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SigningConfig::new(
//!     AmzDate::parse("20130524T000000Z")?,
//!     "us-east-1",
//!     "s3",
//!     "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
//! );
//! let seed = Signature::from("4f232c4386841ef735655705268965c44a0e4690baa4adea153f7db9fa80a0a9");
//!
//! let mut reader = AwsChunkedBuilder::new(HashSpecification::StreamingAws4HmacSha256Payload)
//!     .signer(Arc::new(SigV4ChunkSigner), config, seed)
//!     .build(Bytes::from_static(b"hello"))?;
//!
//! let mut encoded = BytesMut::new();
//! while reader.read(&mut encoded, 4096).await?.is_some() {}
//! assert!(encoded.starts_with(b"5;chunk-signature="));
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::bool_assert_comparison,  // I don't like `assert!(!expression)`. It's very misleading.
    clippy::multiple_crate_versions, // Sometimes not fixable
    clippy::module_name_repetitions,
    clippy::single_match_else,
    clippy::wildcard_imports,
    clippy::let_underscore_untyped,
    clippy::inline_always,
    clippy::needless_continue,
)]

mod utils;

mod http;
mod sig_v4;

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod header;
pub mod stream;

pub use self::error::{AwsChunkedError, ConfigError, StdError};

pub use self::http::{AwsChunkedBody, AwsChunkedBuilder, AwsChunkedReader, StreamState, TrailingHeaders};
pub use self::http::{EncodedLayout, chunk_frame_len, frame_chunk, frame_trailers, trailers_frame_len};
pub use self::http::should_use_aws_chunked;

pub use self::sig_v4::{AmzDate, ChunkSigner, HashSpecification, SigV4ChunkSigner, Signature, SigningConfig};
