//! AWS Signature Version 4, streaming chunk extension

mod amz_date;
pub use self::amz_date::AmzDate;

mod hash_spec;
pub use self::hash_spec::HashSpecification;

mod methods;
pub use self::methods::*;

mod signer;
pub use self::signer::{ChunkSigner, SigV4ChunkSigner, Signature, SigningConfig};
