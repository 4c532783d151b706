//! Signing related implementations.
//!

pub use self::digest::{Digest, DigestAlgorithm};
pub use self::signer::{KeyError, PublicKey, Signer, SigningError};
pub use self::signature::{Signature, SignatureAlgorithm};

pub mod digest;
pub mod signer;
pub mod signature;
#[cfg(feature = "softkeys")] pub mod softsigner;
