//! Digest algorithm and operations.

use bcder::encode;
use bcder::encode::PrimitiveContent;
use ring::digest;
use crate::oid;

// Re-export the things from ring for actual digest generation.
pub use ring::digest::Digest;


//------------ DigestAlgorithm -----------------------------------------------

/// The digest algorithm used by registries.
///
/// Registries only ever use SHA-256. Because of that, this type is
/// currently a zero-sized struct. If additional algorithms are ever needed,
/// it will change into an enum.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct DigestAlgorithm(());

/// # Creating Digest Values
///
impl DigestAlgorithm {
    pub fn sha256() -> Self {
        DigestAlgorithm(())
    }

    /// Returns the digest of `data` using this algorithm.
    pub fn digest(self, data: &[u8]) -> Digest {
        digest::digest(&digest::SHA256, data)
    }

    /// Returns the length of a digest value in octets.
    pub fn digest_len(self) -> usize {
        digest::SHA256.output_len()
    }
}


/// # ASN.1 Values
///
/// Digest algorithms appear in CMS either alone or in sets with the following
/// syntax:
///
/// ```txt
/// DigestAlgorithmIdentifiers ::= SET OF DigestAlgorithmIdentifier
/// DigestAlgorithmIdentifier  ::= AlgorithmIdentifier
/// AlgorithmIdentifier        ::= SEQUENCE {
///      algorithm                 OBJECT IDENTIFIER,
///      parameters                ANY DEFINED BY algorithm OPTIONAL }
/// ```
///
/// Registries leave out the _parameters_ field entirely.
impl DigestAlgorithm {
    /// Provides an encoder for a single algorithm identifier.
    pub fn encode(self) -> impl encode::Values {
        encode::sequence(oid::SHA256.encode())
    }

    /// Provides an encoder for a identifers as the sole value of a set.
    pub fn encode_set(self) -> impl encode::Values {
        encode::set(self.encode())
    }
}


//============ Tests =========================================================
