//! The PKCS #12 shell of a registry.

use bcder::decode;
use bcder::{Mode, OctetString};
use bcder::decode::{DecodeError, IntoSource, Source};
use bytes::Bytes;
use crate::der;
use crate::cms::{AlgorithmIdentifier, ContentInfo};


//------------ Pfx -----------------------------------------------------------

/// The outermost structure of a registry.
///
/// ```txt
/// PFX ::= SEQUENCE {
///     version  INTEGER {v3(3)}(v3,...),
///     authSafe ContentInfo,
///     macData  MacData OPTIONAL }
/// ```
///
/// In a registry, the authenticated safe is CMS signed data rather than
/// plain data as in regular PKCS #12 files.
#[derive(Clone, Debug)]
pub struct Pfx {
    version: Option<i64>,
    auth_safe: ContentInfo,
    mac_data: Option<MacData>,
}

impl Pfx {
    pub fn decode<S: IntoSource>(
        source: S
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            Ok(Pfx {
                version: der::take_version(cons)?,
                auth_safe: ContentInfo::take_from(cons)?,
                mac_data: MacData::take_opt_from(cons)?,
            })
        })
    }

    /// Returns the version or `None` if it doesn’t fit into an `i64`.
    pub fn version(&self) -> Option<i64> {
        self.version
    }

    pub fn auth_safe(&self) -> &ContentInfo {
        &self.auth_safe
    }

    pub fn mac_data(&self) -> Option<&MacData> {
        self.mac_data.as_ref()
    }
}


//------------ MacData -------------------------------------------------------

/// The password integrity data of a PFX.
///
/// ```txt
/// MacData ::= SEQUENCE {
///     mac        DigestInfo,
///     macSalt    OCTET STRING,
///     iterations INTEGER DEFAULT 1 }
///
/// DigestInfo ::= SEQUENCE {
///     digestAlgorithm DigestAlgorithmIdentifier,
///     digest          OCTET STRING }
/// ```
///
/// The data is kept for display only. It is never verified.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MacData {
    digest_algorithm: AlgorithmIdentifier,
    digest: Bytes,
    salt: Bytes,
    iterations: u32,
}

impl MacData {
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let (digest_algorithm, digest) = cons.take_sequence(|cons| {
                Ok((
                    AlgorithmIdentifier::take_from(cons)?,
                    OctetString::take_from(cons)?.into_bytes(),
                ))
            })?;
            Ok(MacData {
                digest_algorithm,
                digest,
                salt: OctetString::take_from(cons)?.into_bytes(),
                iterations: cons.take_opt_u32()?.unwrap_or(1),
            })
        })
    }

    pub fn digest_algorithm(&self) -> &AlgorithmIdentifier {
        &self.digest_algorithm
    }

    pub fn digest(&self) -> &Bytes {
        &self.digest
    }

    pub fn salt(&self) -> &Bytes {
        &self.salt
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}


//============ Tests =========================================================
