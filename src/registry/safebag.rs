//! Safe bags carrying the role certificates.

use std::convert::Infallible;
use bcder::decode;
use bcder::{Mode, Oid, Tag};
use bcder::decode::{DecodeError, IntoSource, Source};
use bytes::Bytes;
use crate::{attr, der, oid};
use crate::attr::{Attribute, AttrValue};
use crate::error::{Element, ElementError};
use crate::x509::{Cert, CertSummary};


//------------ SafeBag -------------------------------------------------------

/// A single bag of the safe contents.
///
/// ```txt
/// SafeBag ::= SEQUENCE {
///     bagId         BAG-TYPE.&id ({PKCS12BagSet}),
///     bagValue      [0] EXPLICIT BAG-TYPE.&Type({PKCS12BagSet}{@bagId}),
///     bagAttributes SET OF PKCS12Attribute OPTIONAL }
/// ```
///
/// If the bag is a cert bag, it is decoded right away. A cert bag that
/// fails to decode makes the whole bag fail.
#[derive(Clone, Debug)]
pub struct SafeBag {
    bag_id: Oid<Bytes>,

    /// The content octets of the `[0]` bag value.
    value: Bytes,

    /// The content octets of the attribute set if present.
    attributes: Option<Bytes>,

    cert_bag: Option<CertBag>,
}

impl SafeBag {
    /// Decodes a complete safe bag.
    pub fn decode(data: Bytes) -> Result<Self, DecodeError<Infallible>> {
        let mut res = Mode::Der.decode(data, Self::take_from)?;
        if res.bag_id == oid::CERT_BAG {
            res.cert_bag = Some(CertBag::decode(
                der::recover_tlv_bytes(res.value.clone(), der::SEQUENCE)
            )?);
        }
        Ok(res)
    }

    fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let bag_id = Oid::take_from(cons)?;
            let value = cons.take_value_if(Tag::CTX_0, der::take_content)?;
            let attributes = cons.take_opt_set(|cons| {
                cons.capture_all()
            })?.map(|captured| captured.into_bytes());
            Ok(SafeBag { bag_id, value, attributes, cert_bag: None })
        })
    }

    pub fn bag_id(&self) -> &Oid<Bytes> {
        &self.bag_id
    }

    /// Returns the content octets of the bag value.
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Returns the cert bag if this is one.
    pub fn cert_bag(&self) -> Option<&CertBag> {
        self.cert_bag.as_ref()
    }

    /// Decodes the bag attributes.
    pub fn attributes(&self) -> Vec<Result<Attribute, ElementError>> {
        self.attributes.as_ref().map(|raw| {
            attr::decode_set(raw)
        }).unwrap_or_default()
    }

    /// Creates the summary of the bag.
    ///
    /// Attributes that fail to decode are added to `skipped`.
    pub fn info(&self, skipped: &mut Vec<ElementError>) -> SafeBagInfo {
        let attributes = self.attributes().into_iter().filter_map(|item| {
            match item {
                Ok(item) => Some(item),
                Err(err) => {
                    skipped.push(err);
                    None
                }
            }
        }).flat_map(|item| item.decode_values()).collect();
        let cert_bag = self.cert_bag.as_ref();
        SafeBagInfo {
            bag_type: oid::display(&self.bag_id),
            cert_type: cert_bag.map(|bag| oid::cert_type_name(&bag.cert_id)),
            summary: cert_bag.and_then(|bag| {
                bag.certificate().map(Cert::summary)
            }),
            cert_len: cert_bag.map(|bag| bag.cert_value.len()).unwrap_or(0),
            attributes,
        }
    }
}


//------------ CertBag -------------------------------------------------------

/// A bag holding a certificate.
///
/// ```txt
/// CertBag ::= SEQUENCE {
///     certId    BAG-TYPE.&id   ({CertTypes}),
///     certValue [0] EXPLICIT BAG-TYPE.&Type ({CertTypes}{@certId}) }
/// ```
///
/// For X.509 certificates, the value is an OCTET STRING containing the
/// certificate. Producers that tag implicitly put the certificate directly
/// into the `[0]` value. Either way, we keep the certificate octets.
#[derive(Clone, Debug)]
pub struct CertBag {
    cert_id: Oid<Bytes>,
    cert_value: Bytes,

    /// The decoded certificate if the value is a valid certificate.
    cert: Option<Cert>,
}

impl CertBag {
    pub fn decode<S: IntoSource>(
        source: S
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let cert_id = Oid::take_from(cons)?;
            let content = cons.take_value_if(Tag::CTX_0, der::take_content)?;
            let cert_value = der::unwrap_primitive_bytes(
                &content, der::OCTET_STRING
            );
            let cert = match Cert::decode(cert_value.clone()) {
                Ok(cert) => Some(cert),
                Err(err) => {
                    log::debug!(
                        "cert bag value of {} octets is not a certificate: {}",
                        cert_value.len(), err
                    );
                    None
                }
            };
            Ok(CertBag { cert_id, cert_value, cert })
        })
    }

    pub fn cert_id(&self) -> &Oid<Bytes> {
        &self.cert_id
    }

    /// Returns the octets of the certificate.
    pub fn cert_value(&self) -> &Bytes {
        &self.cert_value
    }

    pub fn certificate(&self) -> Option<&Cert> {
        self.cert.as_ref()
    }
}


//------------ SafeBagInfo ---------------------------------------------------

/// What we know about a safe bag.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SafeBagInfo {
    /// The name or dotted form of the bag type.
    pub bag_type: String,

    /// The display name of the certificate type for cert bags.
    pub cert_type: Option<String>,

    /// The certificate summary if the bag contains a valid certificate.
    pub summary: Option<CertSummary>,

    /// The length of the certificate octets.
    pub cert_len: usize,

    pub attributes: Vec<AttrValue>,
}

impl SafeBagInfo {
    /// Returns the value of the role name attribute if present.
    pub fn role_name(&self) -> Option<&str> {
        self.attributes.iter().find(|attr| {
            attr.name == "roleName"
        }).map(|attr| attr.value.as_str())
    }
}


//------------ Functions -----------------------------------------------------

/// Decodes the safe contents.
///
/// ```txt
/// SafeContents ::= SEQUENCE OF SafeBag
/// ```
///
/// The data may or may not include the SEQUENCE tag. Returns one item per
/// bag. A bag that fails to decode results in an error for that bag only.
/// If the framing breaks, the remaining bags are lost.
pub fn decode_safe_contents(data: &[u8]) -> Vec<Result<SafeBag, ElementError>> {
    let data = der::recover_tlv(data, der::SEQUENCE);
    let content = match der::read_single(&data) {
        Ok(tlv) => tlv.content(),
        Err(err) => {
            return vec![Err(ElementError::new(Element::SafeBag, 0, err))]
        }
    };
    der::elements(content).enumerate().map(|(index, item)| {
        let tlv = item.map_err(|err| {
            ElementError::new(Element::SafeBag, index, err)
        })?;
        SafeBag::decode(Bytes::copy_from_slice(tlv.as_slice())).map_err(|err| {
            ElementError::new(Element::SafeBag, index, err)
        })
    }).collect()
}


//============ Tests =========================================================
