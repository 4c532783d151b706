//! The generic CMS signed data structures.
//!
//! These types follow [RFC 5652] closely but are lenient with regard to
//! the tagging of the context-specific fields: wherever a producer may have
//! used either implicit or explicit tagging, we store the content of the
//! tagged value and recover its framing through [`der::recover_tlv`] and
//! [`der::unwrap_primitive`] when it is accessed.
//!
//! [RFC 5652]: https://tools.ietf.org/html/rfc5652

use bcder::decode;
use bcder::{Mode, OctetString, Oid, Tag};
use bcder::decode::{DecodeError, IntoSource, Source};
use bytes::Bytes;
use crate::{attr, der};
use crate::attr::Attribute;
use crate::error::{Element, ElementError, ParseError};
use crate::util::hex;
use crate::x509::{Cert, Name, Serial};


//------------ ContentInfo ---------------------------------------------------

/// The outermost structure of a CMS object.
///
/// ```txt
/// ContentInfo ::= SEQUENCE {
///     contentType ContentType,
///     content     [0] EXPLICIT ANY DEFINED BY contentType }
/// ```
///
/// The content is kept as the content octets of the `[0]` value. Some
/// producers place the complete encoding of the inner value there, others
/// only its content.
#[derive(Clone, Debug)]
pub struct ContentInfo {
    content_type: Oid<Bytes>,
    content: Bytes,
}

impl ContentInfo {
    pub fn decode<S: IntoSource>(
        source: S
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            Ok(ContentInfo {
                content_type: Oid::take_from(cons)?,
                content: cons.take_value_if(Tag::CTX_0, der::take_content)?,
            })
        })
    }

    pub fn content_type(&self) -> &Oid<Bytes> {
        &self.content_type
    }

    /// Returns the content octets of the `[0]` value.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Returns the complete encoding of the content.
    ///
    /// `tag` is the universal tag the content is expected to have.
    pub fn recover_content(&self, tag: u8) -> Bytes {
        der::recover_tlv_bytes(self.content.clone(), tag)
    }
}


//------------ AlgorithmIdentifier -------------------------------------------

/// An algorithm identifier with optional parameters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AlgorithmIdentifier {
    algorithm: Oid<Bytes>,

    /// The complete encoding of the parameters if present.
    parameters: Option<Bytes>,
}

impl AlgorithmIdentifier {
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(Self::from_constructed)
    }

    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(Self::from_constructed)
    }

    fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let algorithm = Oid::take_from(cons)?;
        let parameters = cons.capture_all()?;
        Ok(AlgorithmIdentifier {
            algorithm,
            parameters: if parameters.as_slice().is_empty() {
                None
            }
            else {
                Some(parameters.into_bytes())
            }
        })
    }

    pub fn algorithm(&self) -> &Oid<Bytes> {
        &self.algorithm
    }

    pub fn parameters(&self) -> Option<&Bytes> {
        self.parameters.as_ref()
    }
}


//------------ SignedData ----------------------------------------------------

/// CMS signed data.
///
/// ```txt
/// SignedData ::= SEQUENCE {
///     version           CMSVersion,
///     digestAlgorithms  DigestAlgorithmIdentifiers,
///     encapContentInfo  EncapsulatedContentInfo,
///     certificates      [0] IMPLICIT CertificateSet OPTIONAL,
///     crls              [1] IMPLICIT RevocationInfoChoices OPTIONAL,
///     signerInfos       SignerInfos }
/// ```
#[derive(Clone, Debug)]
pub struct SignedData {
    version: Option<i64>,
    digest_algorithms: Vec<AlgorithmIdentifier>,
    encap_content_info: EncapsulatedContentInfo,

    /// The content octets of the certificates field.
    certificates: Option<Bytes>,

    /// The content octets of the crls field.
    crls: Option<Bytes>,

    signer_infos: Vec<SignerInfo>,
}

impl SignedData {
    pub fn decode<S: IntoSource>(
        source: S
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    /// Decodes signed data that must span all of `data`.
    ///
    /// This is the nested signed data of both container formats.
    pub(crate) fn decode_single(data: Bytes) -> Result<Self, ParseError> {
        der::read_single(&data).map_err(|err| {
            ParseError::malformed_tlv("signed-data", err)
        })?;
        Self::decode(data).map_err(|err| {
            ParseError::malformed("signed-data", err)
        })
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let version = der::take_version(cons)?;
            let digest_algorithms = cons.take_set(|cons| {
                let mut res = Vec::new();
                while let Some(alg) = AlgorithmIdentifier::take_opt_from(
                    cons
                )? {
                    res.push(alg)
                }
                Ok(res)
            })?;
            let encap_content_info = EncapsulatedContentInfo::take_from(cons)?;
            let certificates = cons.take_opt_value_if(
                Tag::CTX_0, der::take_content
            )?;
            let crls = cons.take_opt_value_if(Tag::CTX_1, der::take_content)?;
            let signer_infos = cons.take_set(|cons| {
                let mut res = Vec::new();
                while let Some(info) = SignerInfo::take_opt_from(cons)? {
                    res.push(info)
                }
                Ok(res)
            })?;
            Ok(SignedData {
                version, digest_algorithms, encap_content_info,
                certificates, crls, signer_infos,
            })
        })
    }

    pub fn version(&self) -> Option<i64> {
        self.version
    }

    pub fn digest_algorithms(&self) -> &[AlgorithmIdentifier] {
        &self.digest_algorithms
    }

    pub fn encap_content_info(&self) -> &EncapsulatedContentInfo {
        &self.encap_content_info
    }

    /// Returns the raw content of the certificates field if present.
    pub fn raw_certificates(&self) -> Option<&Bytes> {
        self.certificates.as_ref()
    }

    /// Returns the raw content of the crls field if present.
    pub fn raw_crls(&self) -> Option<&Bytes> {
        self.crls.as_ref()
    }

    pub fn signer_infos(&self) -> &[SignerInfo] {
        &self.signer_infos
    }

    /// Decodes the certificate set.
    ///
    /// Returns one item per element of the set. See
    /// [`decode_certificate_set`] for details.
    pub fn certificates(&self) -> Vec<Result<Cert, ElementError>> {
        match self.certificates {
            Some(ref raw) => decode_certificate_set(raw),
            None => Vec::new()
        }
    }
}


//------------ EncapsulatedContentInfo ---------------------------------------

/// The signed content.
///
/// ```txt
/// EncapsulatedContentInfo ::= SEQUENCE {
///     eContentType ContentType,
///     eContent     [0] EXPLICIT OCTET STRING OPTIONAL }
/// ```
#[derive(Clone, Debug)]
pub struct EncapsulatedContentInfo {
    content_type: Oid<Bytes>,

    /// The octets of the content with any OCTET STRING wrapper removed.
    content: Option<Bytes>,
}

impl EncapsulatedContentInfo {
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let content_type = Oid::take_from(cons)?;
            let content = cons.take_opt_value_if(
                Tag::CTX_0, der::take_content
            )?;
            Ok(EncapsulatedContentInfo {
                content_type,
                content: content.map(|content| {
                    der::unwrap_primitive_bytes(&content, der::OCTET_STRING)
                }),
            })
        })
    }

    pub fn content_type(&self) -> &Oid<Bytes> {
        &self.content_type
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }
}


//------------ SignerInfo ----------------------------------------------------

/// Information about a single signer.
///
/// ```txt
/// SignerInfo ::= SEQUENCE {
///     version            CMSVersion,
///     sid                SignerIdentifier,
///     digestAlgorithm    DigestAlgorithmIdentifier,
///     signedAttrs        [0] IMPLICIT SignedAttributes OPTIONAL,
///     signatureAlgorithm SignatureAlgorithmIdentifier,
///     signature          SignatureValue,
///     unsignedAttrs      [1] IMPLICIT UnsignedAttributes OPTIONAL }
/// ```
#[derive(Clone, Debug)]
pub struct SignerInfo {
    version: Option<i64>,
    sid: SignerIdentifier,
    digest_algorithm: AlgorithmIdentifier,

    /// The content octets of the signed attributes field.
    signed_attrs: Option<Bytes>,

    signature_algorithm: AlgorithmIdentifier,
    signature: Bytes,

    /// The content octets of the unsigned attributes field.
    unsigned_attrs: Option<Bytes>,
}

impl SignerInfo {
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            Ok(SignerInfo {
                version: der::take_version(cons)?,
                sid: SignerIdentifier::take_from(cons)?,
                digest_algorithm: AlgorithmIdentifier::take_from(cons)?,
                signed_attrs: cons.take_opt_value_if(
                    Tag::CTX_0, der::take_content
                )?,
                signature_algorithm: AlgorithmIdentifier::take_from(cons)?,
                signature: OctetString::take_from(cons)?.into_bytes(),
                unsigned_attrs: cons.take_opt_value_if(
                    Tag::CTX_1, der::take_content
                )?,
            })
        })
    }

    pub fn version(&self) -> Option<i64> {
        self.version
    }

    pub fn sid(&self) -> &SignerIdentifier {
        &self.sid
    }

    pub fn digest_algorithm(&self) -> &AlgorithmIdentifier {
        &self.digest_algorithm
    }

    pub fn signature_algorithm(&self) -> &AlgorithmIdentifier {
        &self.signature_algorithm
    }

    pub fn signature(&self) -> &Bytes {
        &self.signature
    }

    /// Returns the raw content of the signed attributes if present.
    pub fn raw_signed_attrs(&self) -> Option<&Bytes> {
        self.signed_attrs.as_ref()
    }

    pub fn raw_unsigned_attrs(&self) -> Option<&Bytes> {
        self.unsigned_attrs.as_ref()
    }

    /// Decodes the signed attributes.
    pub fn signed_attributes(&self) -> Vec<Result<Attribute, ElementError>> {
        self.signed_attrs.as_ref().map(|raw| {
            attr::decode_set(raw)
        }).unwrap_or_default()
    }

    /// Decodes the unsigned attributes.
    pub fn unsigned_attributes(
        &self
    ) -> Vec<Result<Attribute, ElementError>> {
        self.unsigned_attrs.as_ref().map(|raw| {
            attr::decode_set(raw)
        }).unwrap_or_default()
    }
}


//------------ SignerIdentifier ----------------------------------------------

/// The identifier of the certificate of a signer.
///
/// ```txt
/// SignerIdentifier ::= CHOICE {
///     issuerAndSerialNumber IssuerAndSerialNumber,
///     subjectKeyIdentifier  [0] SubjectKeyIdentifier }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignerIdentifier {
    /// The content octets of the `[0]` value.
    ///
    /// Depending on the producer, this is either the key identifier itself
    /// or an OCTET STRING containing it.
    SubjectKeyIdentifier(Bytes),

    /// The complete encoding of the value.
    IssuerAndSerialNumber(Bytes),
}

impl SignerIdentifier {
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        if let Some(content) = cons.take_opt_value_if(
            Tag::CTX_0, der::take_content
        )? {
            return Ok(SignerIdentifier::SubjectKeyIdentifier(content))
        }
        cons.capture_one().map(|captured| {
            SignerIdentifier::IssuerAndSerialNumber(captured.into_bytes())
        })
    }

    /// Returns the stored octets of the identifier.
    pub fn as_slice(&self) -> &[u8] {
        match *self {
            SignerIdentifier::SubjectKeyIdentifier(ref raw) => raw.as_ref(),
            SignerIdentifier::IssuerAndSerialNumber(ref raw) => raw.as_ref(),
        }
    }

    /// Returns the subject key identifier if this is one.
    pub fn key_identifier(&self) -> Option<&[u8]> {
        match *self {
            SignerIdentifier::SubjectKeyIdentifier(ref raw) => {
                Some(der::unwrap_primitive(raw.as_ref(), der::OCTET_STRING))
            }
            SignerIdentifier::IssuerAndSerialNumber(_) => None
        }
    }

    /// Decodes issuer and serial number.
    ///
    /// Returns `None` if this isn’t an issuer and serial number or if the
    /// value doesn’t decode.
    pub fn issuer_and_serial(&self) -> Option<(Name, Serial)> {
        match *self {
            SignerIdentifier::IssuerAndSerialNumber(ref raw) => {
                Mode::Der.decode(raw.clone(), |cons| {
                    cons.take_sequence(|cons| {
                        Ok((Name::take_from(cons)?, Serial::take_from(cons)?))
                    })
                }).ok()
            }
            SignerIdentifier::SubjectKeyIdentifier(_) => None
        }
    }

    /// Returns the kind of identifier as a string.
    pub fn kind(&self) -> &'static str {
        match *self {
            SignerIdentifier::SubjectKeyIdentifier(_) => {
                "subjectKeyIdentifier"
            }
            SignerIdentifier::IssuerAndSerialNumber(_) => {
                "issuerAndSerialNumber"
            }
        }
    }

    /// Returns a display string for the identifier.
    ///
    /// Key identifiers are shown in hex. Issuer and serial number are shown
    /// as `issuer=<name>, serial=<hex>` if they decode and in hex
    /// otherwise.
    pub fn display(&self) -> String {
        if let Some(key_id) = self.key_identifier() {
            return hex::encode_string(key_id)
        }
        match self.issuer_and_serial() {
            Some((issuer, serial)) => {
                format!("issuer={}, serial={}", issuer, serial)
            }
            None => hex::encode_string(self.as_slice())
        }
    }
}


//------------ Functions -----------------------------------------------------

/// Decodes a certificate set.
///
/// `raw` is the content of the `[0]` certificates field. It may or may not
/// still contain the SET tag. Each element of the set is either a
/// certificate or an OCTET STRING wrapping one.
///
/// Returns one item per element. A certificate that fails to decode is
/// reported as an error for that element only. If the framing of the set
/// is broken, the remaining elements are lost.
pub fn decode_certificate_set(raw: &[u8]) -> Vec<Result<Cert, ElementError>> {
    let set = der::recover_tlv(raw, der::SET);
    let content = match der::read_single(&set) {
        Ok(tlv) => tlv.content(),
        Err(err) => {
            return vec![Err(ElementError::new(Element::Certificate, 0, err))]
        }
    };
    der::elements(content).enumerate().map(|(index, item)| {
        let tlv = item.map_err(|err| {
            ElementError::new(Element::Certificate, index, err)
        })?;
        let cert = if tlv.identifier() == der::OCTET_STRING {
            tlv.content()
        }
        else {
            tlv.as_slice()
        };
        Cert::decode(Bytes::copy_from_slice(cert)).map_err(|err| {
            ElementError::new(Element::Certificate, index, err)
        })
    }).collect()
}


//============ Tests =========================================================
