//! Decoded registries.

use bcder::Oid;
use bytes::Bytes;
use crate::{oid, pem, resolve};
use crate::attr::AttrValue;
use crate::cms::SignerSummary;
use crate::cms::SignedData;
use crate::cms::container::collect;
use crate::der;
use crate::error::{ElementError, ParseError};
use crate::x509::Cert;
use super::pfx::{MacData, Pfx};
use super::safebag::{decode_safe_contents, SafeBag, SafeBagInfo};


//------------ Container -----------------------------------------------------

/// A decoded registry.
///
/// The container owns everything decoded from the registry. Signers refer
/// to their certificate by its index in [`certificates`][Self::certificates].
#[derive(Clone, Debug)]
pub struct Container {
    pfx_version: i64,
    content_type: Oid<Bytes>,
    mac_data: Option<MacData>,
    signed_data: SignedData,
    certificates: Vec<Cert>,
    bags: Vec<SafeBag>,
    bag_infos: Vec<SafeBagInfo>,
    signers: Vec<SignerSummary>,
    skipped: Vec<ElementError>,
}

impl Container {
    /// Decodes a DER encoded registry.
    ///
    /// The PFX must have version 3 and its authenticated safe must be
    /// signed data. If the signed data encapsulates data, it is decoded as
    /// safe contents.
    pub fn decode(data: &[u8]) -> Result<Self, ParseError> {
        der::read_single(data).map_err(|err| {
            ParseError::malformed_tlv("pfx", err)
        })?;
        let pfx = Pfx::decode(
            Bytes::copy_from_slice(data)
        ).map_err(|err| ParseError::malformed("pfx", err))?;
        if pfx.version() != Some(3) {
            return Err(ParseError::unsupported_version(pfx.version()))
        }
        let auth_safe = pfx.auth_safe();
        if *auth_safe.content_type() != oid::SIGNED_DATA {
            return Err(ParseError::unexpected_content_type(
                auth_safe.content_type().clone()
            ))
        }
        let signed_data = SignedData::decode_single(
            auth_safe.recover_content(der::SEQUENCE)
        )?;

        let mut skipped = Vec::new();
        let certificates = collect(signed_data.certificates(), &mut skipped);
        let encap = signed_data.encap_content_info();
        let bags = match encap.content() {
            Some(content) if *encap.content_type() == oid::DATA => {
                collect(decode_safe_contents(content), &mut skipped)
            }
            _ => Vec::new()
        };
        let bag_infos = bags.iter().map(|bag| {
            bag.info(&mut skipped)
        }).collect();
        let signers = signed_data.signer_infos().iter().map(|info| {
            SignerSummary::new(
                info,
                resolve::resolve_signer(info.sid(), &certificates),
                &mut skipped
            )
        }).collect();

        Ok(Container {
            pfx_version: 3,
            content_type: auth_safe.content_type().clone(),
            mac_data: pfx.mac_data().cloned(),
            signed_data, certificates, bags, bag_infos, signers, skipped,
        })
    }

    /// Decodes a registry that may be PEM armored.
    pub fn from_pem_or_der(data: &[u8]) -> Result<Self, ParseError> {
        let der = pem::unwrap_or_der(data).map_err(ParseError::malformed_pem)?;
        Self::decode(&der)
    }

    pub fn pfx_version(&self) -> i64 {
        self.pfx_version
    }

    /// Returns the content type of the authenticated safe.
    pub fn content_type(&self) -> &Oid<Bytes> {
        &self.content_type
    }

    /// Returns the password integrity data if present.
    pub fn mac_data(&self) -> Option<&MacData> {
        self.mac_data.as_ref()
    }

    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    pub fn certificates(&self) -> &[Cert] {
        &self.certificates
    }

    pub fn bags(&self) -> &[SafeBag] {
        &self.bags
    }

    pub fn bag_infos(&self) -> &[SafeBagInfo] {
        &self.bag_infos
    }

    pub fn signers(&self) -> &[SignerSummary] {
        &self.signers
    }

    /// Returns the certificate of the first signer if it was found.
    pub fn signer_certificate(&self) -> Option<&Cert> {
        self.signers.first()?.signer_index.and_then(|idx| {
            self.certificates.get(idx)
        })
    }

    /// Returns the signed attributes of the first signer.
    pub fn signer_attributes(&self) -> &[AttrValue] {
        match self.signers.first() {
            Some(signer) => &signer.signed_attributes,
            None => &[]
        }
    }

    /// Returns the elements that had to be skipped.
    pub fn skipped(&self) -> &[ElementError] {
        &self.skipped
    }
}


//============ Tests =========================================================
