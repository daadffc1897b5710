//! SigV4 string-to-sign and signature calculation for chunks and trailers

use super::AmzDate;

use crate::auth::SecretKey;
use crate::utils::crypto::{hex, hex_sha256, hmac_sha256};

/// `hex(sha256(""))`
pub const EMPTY_STRING_SHA256_HASH: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

const CHUNK_ALGORITHM: &str = "AWS4-HMAC-SHA256-PAYLOAD";
const TRAILER_ALGORITHM: &str = "AWS4-HMAC-SHA256-TRAILER";

/// `<date>/<region>/<service>/aws4_request`
#[must_use]
pub fn create_scope(amz_date: &AmzDate, region: &str, service: &str) -> String {
    format!("{}/{region}/{service}/aws4_request", amz_date.fmt_date())
}

fn string_to_sign_prefix(algorithm: &str, amz_date: &AmzDate, region: &str, service: &str, prev_signature: &[u8]) -> Vec<u8> {
    let mut ans: Vec<u8> = Vec::with_capacity(256);
    ans.extend_from_slice(algorithm.as_bytes());
    ans.push(b'\n');
    ans.extend_from_slice(amz_date.fmt_iso8601().as_bytes());
    ans.push(b'\n');
    ans.extend_from_slice(create_scope(amz_date, region, service).as_bytes());
    ans.push(b'\n');
    ans.extend_from_slice(prev_signature);
    ans.push(b'\n');
    ans
}

/// Creates the string to sign of one chunk
#[must_use]
pub fn create_chunk_string_to_sign(
    amz_date: &AmzDate,
    region: &str,
    service: &str,
    prev_signature: &[u8],
    chunk_data: &[u8],
) -> Vec<u8> {
    let mut ans = string_to_sign_prefix(CHUNK_ALGORITHM, amz_date, region, service, prev_signature);
    ans.extend_from_slice(EMPTY_STRING_SHA256_HASH.as_bytes());
    ans.push(b'\n');
    ans.extend_from_slice(hex_sha256(chunk_data).as_bytes());
    ans
}

/// Creates the string to sign of the trailer block
///
/// `canonical_trailers` are `name:value\n` lines in ascending name order.
#[must_use]
pub fn create_trailer_string_to_sign(
    amz_date: &AmzDate,
    region: &str,
    service: &str,
    prev_signature: &[u8],
    canonical_trailers: &[u8],
) -> Vec<u8> {
    let mut ans = string_to_sign_prefix(TRAILER_ALGORITHM, amz_date, region, service, prev_signature);
    ans.extend_from_slice(hex_sha256(canonical_trailers).as_bytes());
    ans
}

/// Derives the signing key of a scope
#[must_use]
pub fn derive_signing_key(secret_key: &SecretKey, amz_date: &AmzDate, region: &str, service: &str) -> [u8; 32] {
    let secret = {
        let mut k = String::with_capacity(4 + secret_key.expose().len());
        k.push_str("AWS4");
        k.push_str(secret_key.expose());
        zeroize::Zeroizing::new(k)
    };
    let date = hmac_sha256(secret.as_bytes(), amz_date.fmt_date());
    let region = hmac_sha256(date, region);
    let service = hmac_sha256(region, service);
    hmac_sha256(service, "aws4_request")
}

/// Calculates the lowercase hex signature of a string to sign
#[must_use]
pub fn calculate_signature(string_to_sign: &[u8], secret_key: &SecretKey, amz_date: &AmzDate, region: &str, service: &str) -> String {
    let signing_key = derive_signing_key(secret_key, amz_date, region, service);
    hex(hmac_sha256(signing_key, string_to_sign))
}
