//! Signature algorithms and operations.

use bcder::encode;
use bcder::encode::PrimitiveContent;
use bcder::{ConstOid, OctetString};
use bytes::Bytes;
use crate::oid;


//------------ SignatureAlgorithm --------------------------------------------

/// The signature algorithm used for registries.
///
/// This is ECDSA over the P-256 curve with SHA-256. The signature value is
/// the DER encoding of `SEQUENCE { r INTEGER, s INTEGER }`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct SignatureAlgorithm(());

impl SignatureAlgorithm {
    pub fn ecdsa_p256_sha256() -> Self {
        SignatureAlgorithm(())
    }

    /// Returns the object identifier of the algorithm.
    pub fn oid(self) -> ConstOid {
        oid::ECDSA_WITH_SHA256
    }

    /// Provides an encoder for the algorithm identifier.
    ///
    /// The identifier has no parameters.
    pub fn encode(self) -> impl encode::Values {
        encode::sequence(self.oid().encode())
    }
}


//------------ Signature -----------------------------------------------------

/// A signature value together with the algorithm that created it.
#[derive(Clone, Debug)]
pub struct Signature {
    algorithm: SignatureAlgorithm,
    value: Bytes,
}

impl Signature {
    pub fn new(algorithm: SignatureAlgorithm, value: Bytes) -> Self {
        Signature { algorithm, value }
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub fn unwrap(self) -> (SignatureAlgorithm, Bytes) {
        (self.algorithm, self.value)
    }

    /// Provides an encoder for the value as an OCTET STRING.
    pub fn encode_value(&self) -> impl encode::Values + '_ {
        OctetString::encode_slice(self.value.as_ref())
    }
}


//============ Tests =========================================================
