//! Plain CMS signed data objects.

use bytes::Bytes;
use crate::{oid, pem, resolve};
use crate::attr::{Attribute, AttrValue};
use crate::der;
use crate::error::{Element, ElementError, ParseError};
use crate::x509::Cert;
use super::signed_data::{ContentInfo, SignedData, SignerInfo};


//------------ CmsContainer --------------------------------------------------

/// A decoded CMS signed data object.
///
/// Besides the certificates from the certificate set, this keeps the
/// certificates found as PEM blocks in the encapsulated content. Both lists
/// together form the pool searched for the signers’ certificates, with the
/// certificate set first. Signer indexes refer to this combined list, see
/// [`CmsContainer::certificate`].
#[derive(Clone, Debug)]
pub struct CmsContainer {
    content_info: ContentInfo,
    signed_data: SignedData,
    certificates: Vec<Cert>,
    econtent_certs: Vec<Cert>,
    signers: Vec<SignerSummary>,
    skipped: Vec<ElementError>,
}

impl CmsContainer {
    /// Decodes a DER encoded CMS object.
    ///
    /// The object must be signed data and must span all of `data`.
    pub fn decode(data: &[u8]) -> Result<Self, ParseError> {
        der::read_single(data).map_err(|err| {
            ParseError::malformed_tlv("content-info", err)
        })?;
        let content_info = ContentInfo::decode(
            Bytes::copy_from_slice(data)
        ).map_err(|err| ParseError::malformed("content-info", err))?;
        if *content_info.content_type() != oid::SIGNED_DATA {
            return Err(ParseError::unsupported_content_type(
                content_info.content_type().clone()
            ))
        }
        let signed_data = SignedData::decode_single(
            content_info.recover_content(der::SEQUENCE)
        )?;

        let mut skipped = Vec::new();
        let certificates = collect(signed_data.certificates(), &mut skipped);
        let econtent_certs = match signed_data.encap_content_info().content() {
            Some(content) => {
                let certs = pem::certificates(content).into_iter().enumerate();
                certs.filter_map(|(index, cert)| {
                    match Cert::decode(cert) {
                        Ok(cert) => Some(cert),
                        Err(err) => {
                            skipped.push(ElementError::new(
                                Element::Certificate, index, err
                            ));
                            None
                        }
                    }
                }).collect()
            }
            None => Vec::new()
        };
        let signers = signed_data.signer_infos().iter().map(|info| {
            SignerSummary::new(
                info,
                resolve::resolve_signer(
                    info.sid(),
                    certificates.iter().chain(econtent_certs.iter())
                ),
                &mut skipped
            )
        }).collect();

        Ok(CmsContainer {
            content_info, signed_data, certificates, econtent_certs,
            signers, skipped,
        })
    }

    /// Decodes a CMS object that may be PEM armored.
    ///
    /// If the data is armored, the first PEM block is decoded.
    pub fn from_pem_or_der(data: &[u8]) -> Result<Self, ParseError> {
        let der = pem::unwrap_or_der(data).map_err(ParseError::malformed_pem)?;
        Self::decode(&der)
    }

    pub fn content_info(&self) -> &ContentInfo {
        &self.content_info
    }

    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    /// Returns the certificates from the certificate set.
    pub fn certificates(&self) -> &[Cert] {
        &self.certificates
    }

    /// Returns the certificates found in the encapsulated content.
    pub fn econtent_certs(&self) -> &[Cert] {
        &self.econtent_certs
    }

    /// Returns a certificate from the combined certificate list.
    pub fn certificate(&self, index: usize) -> Option<&Cert> {
        self.certificates.iter().chain(
            self.econtent_certs.iter()
        ).nth(index)
    }

    /// Returns the encapsulated content if present.
    pub fn content(&self) -> Option<&Bytes> {
        self.signed_data.encap_content_info().content()
    }

    pub fn signers(&self) -> &[SignerSummary] {
        &self.signers
    }

    /// Returns the certificate of the first signer if it was found.
    pub fn signer_certificate(&self) -> Option<&Cert> {
        self.signers.first()?.signer_index.and_then(|idx| {
            self.certificate(idx)
        })
    }

    /// Returns the elements that had to be skipped.
    pub fn skipped(&self) -> &[ElementError] {
        &self.skipped
    }
}


//------------ SignerSummary -------------------------------------------------

/// What we know about a single signer.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignerSummary {
    /// The version or `None` if it doesn’t fit into an `i64`.
    pub version: Option<i64>,

    /// The kind of signer identifier.
    pub sid_kind: String,

    /// The signer identifier for display.
    pub sid: String,

    /// The name or dotted form of the digest algorithm.
    pub digest_algorithm: String,

    /// The name or dotted form of the signature algorithm.
    pub signature_algorithm: String,

    /// The length of the signature value in octets.
    pub signature_len: usize,

    /// The index of the signer’s certificate if it was found.
    pub signer_index: Option<usize>,

    pub signed_attributes: Vec<AttrValue>,
    pub unsigned_attributes: Vec<AttrValue>,
}

impl SignerSummary {
    /// Creates the summary of a signer info.
    ///
    /// Attributes that fail to decode are added to `skipped`.
    pub(crate) fn new(
        info: &SignerInfo,
        signer_index: Option<usize>,
        skipped: &mut Vec<ElementError>,
    ) -> Self {
        SignerSummary {
            version: info.version(),
            sid_kind: info.sid().kind().into(),
            sid: info.sid().display(),
            digest_algorithm: oid::display(info.digest_algorithm().algorithm()),
            signature_algorithm: oid::display(
                info.signature_algorithm().algorithm()
            ),
            signature_len: info.signature().len(),
            signer_index,
            signed_attributes: values(
                collect(info.signed_attributes(), skipped)
            ),
            unsigned_attributes: values(
                collect(info.unsigned_attributes(), skipped)
            ),
        }
    }
}


//------------ Helpers -------------------------------------------------------

/// Separates decoded elements from skipped ones.
pub(crate) fn collect<T>(
    items: Vec<Result<T, ElementError>>,
    skipped: &mut Vec<ElementError>,
) -> Vec<T> {
    items.into_iter().filter_map(|item| {
        match item {
            Ok(item) => Some(item),
            Err(err) => {
                skipped.push(err);
                None
            }
        }
    }).collect()
}

fn values(attrs: Vec<Attribute>) -> Vec<AttrValue> {
    attrs.iter().flat_map(Attribute::decode_values).collect()
}


//============ Tests =========================================================
