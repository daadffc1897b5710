//! Header names used by aws-chunked requests

pub use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING};

use http::HeaderName;

pub const X_AMZ_CONTENT_SHA256: HeaderName = HeaderName::from_static("x-amz-content-sha256");

pub const X_AMZ_DECODED_CONTENT_LENGTH: HeaderName = HeaderName::from_static("x-amz-decoded-content-length");

pub const X_AMZ_TRAILER: HeaderName = HeaderName::from_static("x-amz-trailer");

/// Trailer line carrying the signature of the trailer block
pub const X_AMZ_TRAILER_SIGNATURE: &str = "x-amz-trailer-signature";

/// `content-encoding` token of the aws-chunked framing
pub const AWS_CHUNKED: &str = "aws-chunked";
