//! Credentials used by the built-in SigV4 chunk signer

mod secret_key;
pub use self::secret_key::SecretKey;
