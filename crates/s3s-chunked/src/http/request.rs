use crate::config::ChunkedConfig;

/// Decides whether a request body should be sent aws-chunked
///
/// One-shot bodies cannot be rewound for a retry with a precomputed payload hash, so they always stream.
/// Seekable bodies stream when their length is unknown or above the configured threshold.
#[must_use]
pub fn should_use_aws_chunked(content_length: Option<u64>, one_shot: bool, config: &ChunkedConfig) -> bool {
    one_shot || content_length.is_none_or(|len| len > config.aws_chunked_threshold)
}
