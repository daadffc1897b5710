use hmac::Hmac;
use hmac::Mac;
use hmac::digest::KeyInit;
use sha2::{Digest, Sha256};

/// `HMAC-SHA256(key, data)`
pub fn hmac_sha256(key: impl AsRef<[u8]>, data: impl AsRef<[u8]>) -> [u8; 32] {
    let mut m = <Hmac<Sha256> as KeyInit>::new_from_slice(key.as_ref()).expect("HMAC can take key of any size");
    Mac::update(&mut m, data.as_ref());
    Mac::finalize(m).into_bytes().into()
}

/// `hex(SHA256(data))`, lowercase
pub fn hex_sha256(data: impl AsRef<[u8]>) -> String {
    hex(Sha256::digest(data.as_ref()))
}

pub fn hex(data: impl AsRef<[u8]>) -> String {
    hex_simd::encode_to_string(data.as_ref(), hex_simd::AsciiCase::Lower)
}
