//! Building new registries.
//!
//! A registry is built from the certificate of the signer, the signer’s key,
//! a list of role certificates, and the signer attributes. The output
//! follows the tagging conventions of the reference registries: all
//! context-tagged fields are explicit and contain the complete encoding of
//! the tagged value, the certificate set is `[0] { SET { OCTET STRING } }`,
//! and the signer info ends with an empty unsigned attribute set.
//!
//! The message digest is calculated over the octets of the safe contents
//! only rather than over the complete encapsulated content info.

use bcder::encode;
use bcder::{Mode, OctetString, Tag};
use bcder::encode::{PrimitiveContent, Values};
use bytes::Bytes;
use crate::{attr, der, oid};
use crate::attr::Attribute;
use crate::crypto::{
    DigestAlgorithm, KeyError, SignatureAlgorithm, Signer, SigningError
};
use crate::error::BuildError;
use crate::x509::{Cert, Time};


//------------ SafeBagInput --------------------------------------------------

/// The input for a single safe bag.
#[derive(Clone, Debug)]
pub struct SafeBagInput {
    /// The DER encoded certificate.
    pub cert: Bytes,

    /// The role name. An empty name is left out.
    pub role_name: String,

    /// The start of the role validity period.
    pub not_before: Option<Time>,

    /// The end of the role validity period.
    pub not_after: Option<Time>,

    /// The local key identifier.
    ///
    /// If this is `None` or empty, the subject key identifier of the
    /// certificate is used if present.
    pub local_key_id: Option<Bytes>,
}

impl SafeBagInput {
    pub fn new(cert: Bytes) -> Self {
        SafeBagInput {
            cert,
            role_name: String::new(),
            not_before: None,
            not_after: None,
            local_key_id: None,
        }
    }

    /// Returns the bag attributes for the input.
    ///
    /// If only one bound of the validity period is given, the other one is
    /// encoded as the zero time.
    fn attributes(&self) -> Result<Vec<Attribute>, BuildError> {
        let mut res = Vec::new();
        if !self.role_name.is_empty() {
            res.push(Attribute::utf8_string(
                oid::ATOM_ROLE_NAME, &self.role_name
            ));
        }
        if self.not_before.is_some() || self.not_after.is_some() {
            res.push(Attribute::validity_period(
                encodable_time(self.not_before)?,
                encodable_time(self.not_after)?,
            ));
        }
        if let Some(key_id) = self.local_key_id() {
            res.push(Attribute::octet_string(oid::LOCAL_KEY_ID, &key_id));
        }
        Ok(res)
    }

    /// Returns the local key identifier for the bag.
    ///
    /// Falls back to the subject key identifier of the certificate. If the
    /// certificate can’t be decoded, there is no fallback.
    fn local_key_id(&self) -> Option<Bytes> {
        match self.local_key_id {
            Some(ref key_id) if !key_id.is_empty() => Some(key_id.clone()),
            _ => {
                let cert = match Cert::decode(self.cert.clone()) {
                    Ok(cert) => cert,
                    Err(err) => {
                        log::debug!(
                            "no local key ID from invalid certificate: {}",
                            err
                        );
                        return None
                    }
                };
                cert.subject_key_identifier().map(Bytes::copy_from_slice)
            }
        }
    }

    /// Returns the complete encoding of the safe bag.
    ///
    /// The certificate is included as given.
    fn encode(&self) -> Result<Bytes, BuildError> {
        let attrs = self.attributes()?;
        let attrs = if attrs.is_empty() {
            None
        }
        else {
            Some(attr::encode_set(&attrs))
        };
        let res = encode::sequence((
            oid::CERT_BAG.encode(), // bagId
            encode::sequence_as(Tag::CTX_0, // bagValue
                encode::sequence((
                    oid::X509_CERTIFICATE.encode(), // certId
                    encode::sequence_as(Tag::CTX_0, // certValue
                        OctetString::encode_slice(self.cert.as_ref())
                    ),
                ))
            ),
            attrs.as_ref().map(|attrs| der::Raw(attrs.as_ref())),
        )).to_captured(Mode::Der).into_bytes();
        Ok(res)
    }
}


//------------ SignerAttrs ---------------------------------------------------

/// The registry specific signed attributes.
#[derive(Clone, Debug, Default)]
pub struct SignerAttrs {
    /// The vehicle identification number. An empty value is left out.
    pub vin: String,

    /// The timestamp of the version attribute.
    pub version_time: Option<Time>,

    /// The registry version.
    pub version: i64,

    /// The user identifier. An empty value is left out.
    pub uid: String,
}

impl SignerAttrs {
    /// Returns all signed attributes for the given content digest.
    ///
    /// The version attribute is included if either the timestamp is given
    /// or the version isn’t zero. A missing timestamp is encoded as the
    /// zero time.
    fn attributes(
        &self, digest: &[u8]
    ) -> Result<Vec<Attribute>, BuildError> {
        let mut res = vec![
            Attribute::content_type(oid::DATA),
            Attribute::message_digest(digest),
        ];
        if !self.vin.is_empty() {
            res.push(Attribute::utf8_string(oid::ATOM_VIN, &self.vin));
        }
        if self.version_time.is_some() || self.version != 0 {
            res.push(Attribute::version(
                encodable_time(self.version_time)?, self.version
            ));
        }
        if !self.uid.is_empty() {
            res.push(Attribute::utf8_string(oid::ATOM_UID, &self.uid));
        }
        Ok(res)
    }
}


/// Returns the time to encode for an optional time.
fn encodable_time(time: Option<Time>) -> Result<Time, BuildError> {
    let time = time.unwrap_or_else(Time::zero);
    if time.is_generalized_time() {
        Ok(time)
    }
    else {
        Err(BuildError::time_out_of_range(time))
    }
}


//------------ build_registry ------------------------------------------------

/// Builds a new registry.
///
/// The registry is signed by `signer` with the key `key`. The certificate
/// of that key is `signer_cert` which must have a subject key identifier.
/// Each item of `bags` is turned into one safe bag.
///
/// Returns the DER encoded PFX.
pub fn build_registry<S: Signer>(
    signer_cert: &Cert,
    signer: &S,
    key: &S::KeyId,
    bags: &[SafeBagInput],
    attrs: &SignerAttrs,
) -> Result<Bytes, BuildError> {
    match signer.get_key_info(key) {
        Ok(_) => { }
        Err(KeyError::KeyNotFound) => {
            return Err(BuildError::missing_signer_key_material())
        }
        Err(KeyError::Signer(err)) => return Err(BuildError::signing(err))
    }
    let key_id = signer_cert.subject_key_identifier().ok_or_else(
        BuildError::missing_subject_key_identifier
    )?;

    let bags = bags.iter().map(SafeBagInput::encode).collect::<Result<
        Vec<_>, _
    >>()?;
    let safe_contents = encode::sequence(
        der::RawList(&bags)
    ).to_captured(Mode::Der).into_bytes();

    let digest_algorithm = DigestAlgorithm::sha256();
    let digest = digest_algorithm.digest(safe_contents.as_ref());
    let signed_attrs = attr::encode_set(&attrs.attributes(digest.as_ref())?);
    let signature = signer.sign(
        key, SignatureAlgorithm::ecdsa_p256_sha256(), &signed_attrs
    ).map_err(|err| match err {
        SigningError::KeyNotFound => BuildError::missing_signer_key_material(),
        err => BuildError::signing(err),
    })?;

    let mut certs = vec![
        der::wrap_tag(der::OCTET_STRING, signer_cert.as_slice())
    ];
    der::sort_set_of(&mut certs);

    let res = encode::sequence((
        3u8.encode(), // version
        encode::sequence(( // authSafe
            oid::SIGNED_DATA.encode(), // contentType
            encode::sequence_as(Tag::CTX_0, // content
                encode::sequence((
                    1u8.encode(), // version
                    digest_algorithm.encode_set(), // digestAlgorithms
                    encode::sequence(( // encapContentInfo
                        oid::DATA.encode(),
                        encode::sequence_as(Tag::CTX_0,
                            OctetString::encode_slice(safe_contents.as_ref())
                        ),
                    )),
                    encode::sequence_as(Tag::CTX_0, // certificates
                        encode::set(der::RawList(&certs))
                    ),
                    encode::set( // signerInfos
                        encode::sequence((
                            1u8.encode(), // version
                            encode::sequence_as(Tag::CTX_0, // sid
                                OctetString::encode_slice(key_id)
                            ),
                            digest_algorithm.encode(), // digestAlgorithm
                            encode::sequence_as(Tag::CTX_0, // signedAttrs
                                der::Raw(signed_attrs.as_ref())
                            ),
                            signature.algorithm().encode(),
                            signature.encode_value(),
                            encode::sequence_as(Tag::CTX_1, // unsignedAttrs
                                der::Raw(b"\x31\x00")
                            ),
                        ))
                    ),
                ))
            ),
        )),
    )).to_captured(Mode::Der).into_bytes();
    Ok(res)
}


//============ Tests =========================================================

#[cfg(all(test, feature = "softkeys"))]
mod test {
    use chrono::{TimeZone, Utc};
    use ring::signature::{UnparsedPublicKey, ECDSA_P256_SHA256_ASN1};
    use crate::crypto::softsigner::{EcdsaSigner, KeyId};
    use crate::registry::Container;
    use crate::util::hex;
    use super::*;

    fn time(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Time {
        Time::new(Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap())
    }

    fn signer() -> (EcdsaSigner, KeyId, Cert) {
        let signer = EcdsaSigner::new();
        let key = signer.key_from_der(
            include_bytes!("../../test-data/signer.key.der")
        ).unwrap();
        let cert = Cert::decode(
            include_bytes!("../../test-data/signer.der").as_ref()
        ).unwrap();
        (signer, key, cert)
    }

    fn bags() -> Vec<SafeBagInput> {
        let mut role = SafeBagInput::new(Bytes::from_static(
            include_bytes!("../../test-data/role.der")
        ));
        role.role_name = "Driver".into();
        role.not_before = Some(time(2026, 1, 1, 0, 0, 0));
        role.not_after = Some(time(2027, 1, 1, 0, 0, 0));
        let mut ivi = SafeBagInput::new(Bytes::from_static(
            include_bytes!("../../test-data/noski.der")
        ));
        ivi.role_name = "IVI".into();
        vec![role, ivi]
    }

    fn attrs() -> SignerAttrs {
        SignerAttrs {
            vin: "XTA21099012345678".into(),
            version_time: Some(time(2026, 1, 15, 17, 40, 21)),
            version: 7,
            uid: "user-42".into(),
        }
    }

    fn build() -> (Bytes, EcdsaSigner, KeyId, Cert) {
        let (signer, key, cert) = signer();
        let data = build_registry(
            &cert, &signer, &key, &bags(), &attrs()
        ).unwrap();
        (data, signer, key, cert)
    }

    /// Returns the elements of the single value in `data`.
    fn elements(data: &[u8]) -> Vec<der::Tlv> {
        der::elements(
            der::read_single(data).unwrap().content()
        ).map(Result::unwrap).collect()
    }

    #[test]
    fn build_and_parse() {
        let (data, signer, key, cert) = build();
        let reg = Container::decode(&data).unwrap();
        assert_eq!(reg.pfx_version(), 3);
        assert_eq!(reg.content_type(), &oid::SIGNED_DATA);
        assert_eq!(reg.certificates().len(), 1);
        assert_eq!(reg.bags().len(), 2);
        assert!(reg.skipped().is_empty());
        assert!(reg.mac_data().is_none());

        let signer_cert = reg.signer_certificate().unwrap();
        assert!(!signer_cert.subject_key_identifier().unwrap().is_empty());
        assert_eq!(
            signer_cert.subject_key_identifier(),
            cert.subject_key_identifier()
        );
        assert_eq!(reg.signers()[0].sid_kind, "subjectKeyIdentifier");

        let signer_attrs = reg.signer_attributes();
        let value = |name: &str| {
            signer_attrs.iter().find(|attr| attr.name == name).map(|attr| {
                attr.value.clone()
            })
        };
        assert_eq!(value("VIN").unwrap(), "XTA21099012345678");
        assert_eq!(
            value("VER").unwrap(),
            "timestamp=2026-01-15T17:40:21Z, version=7"
        );
        assert_eq!(value("UID").unwrap(), "user-42");
        assert_eq!(value("contentType").unwrap(), "pkcs7-data");
        let content = reg.signed_data().encap_content_info().content().unwrap();
        assert_eq!(
            value("messageDigest").unwrap(),
            hex::encode_string(
                DigestAlgorithm::sha256().digest(content).as_ref()
            )
        );

        let infos = reg.bag_infos();
        assert_eq!(infos[0].role_name(), Some("Driver"));
        assert_eq!(infos[0].summary.as_ref().unwrap().serial, "0100");
        assert!(infos[0].attributes.iter().any(|attr| {
            attr.name == "localKeyID"
                && attr.value == "15f961ef1f41e3a03c0e578df122457019dfa4b7"
        }));
        assert!(infos[0].attributes.iter().any(|attr| {
            attr.name == "roleValidityPeriod"
                && attr.value == "notBefore=2026-01-01 00:00:00, \
                                  notAfter=2027-01-01 00:00:00"
        }));
        assert_eq!(infos[1].role_name(), Some("IVI"));
        assert_eq!(infos[1].attributes.len(), 1);

        // The signature is over the DER encoded SET of signed attributes.
        let info = &reg.signed_data().signer_infos()[0];
        let signed_attrs = der::recover_tlv(
            info.raw_signed_attrs().unwrap(), der::SET
        );
        let public_key = signer.get_key_info(&key).unwrap();
        UnparsedPublicKey::new(
            &ECDSA_P256_SHA256_ASN1, public_key.bits()
        ).verify(&signed_attrs, info.signature()).unwrap();
    }

    #[test]
    fn output_shape() {
        let (data, _, _, cert) = build();

        let pfx = elements(&data);
        assert_eq!(pfx.len(), 2);
        assert_eq!(pfx[0].as_slice(), b"\x02\x01\x03");
        let content_info = elements(pfx[1].as_slice());
        assert_eq!(
            content_info[0].content(), oid::SIGNED_DATA.0
        );
        assert_eq!(content_info[1].identifier(), der::CTX_CONS_0);

        // The complete SignedData is inside [0].
        let signed_data = elements(content_info[1].content());
        assert_eq!(signed_data.len(), 5);
        assert_eq!(signed_data[0].as_slice(), b"\x02\x01\x01");
        assert_eq!(
            signed_data[1].as_slice(),
            b"\x31\x0d\x30\x0b\x06\x09\x60\x86\x48\x01\x65\x03\x04\x02\x01"
        );

        let encap = elements(signed_data[2].as_slice());
        assert_eq!(encap[0].content(), oid::DATA.0);
        assert_eq!(encap[1].identifier(), der::CTX_CONS_0);
        assert_eq!(encap[1].content()[0], der::OCTET_STRING);

        assert_eq!(signed_data[3].identifier(), der::CTX_CONS_0);
        let certs = elements(signed_data[3].content());
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].identifier(), der::OCTET_STRING);
        assert_eq!(certs[0].content(), cert.as_slice());

        let signer_infos = elements(signed_data[4].as_slice());
        assert_eq!(signer_infos.len(), 1);
        let signer_info = elements(signer_infos[0].as_slice());
        assert_eq!(signer_info.len(), 7);
        assert_eq!(signer_info[0].as_slice(), b"\x02\x01\x01");
        assert_eq!(signer_info[1].identifier(), der::CTX_CONS_0);
        assert_eq!(
            der::read_single(signer_info[1].content()).unwrap().content(),
            cert.subject_key_identifier().unwrap()
        );
        assert_eq!(
            signer_info[2].as_slice(),
            b"\x30\x0b\x06\x09\x60\x86\x48\x01\x65\x03\x04\x02\x01"
        );
        assert_eq!(signer_info[3].identifier(), der::CTX_CONS_0);
        let attrs = elements(signer_info[3].content());
        assert_eq!(attrs.len(), 5);
        assert!(attrs.windows(2).all(|pair| {
            pair[0].as_slice() <= pair[1].as_slice()
        }));
        assert_eq!(
            signer_info[4].as_slice(),
            b"\x30\x0a\x06\x08\x2a\x86\x48\xce\x3d\x04\x03\x02"
        );
        assert_eq!(signer_info[5].identifier(), der::OCTET_STRING);
        assert_eq!(signer_info[6].as_slice(), b"\xa1\x02\x31\x00");

        // Safe bags.
        let safe_contents = der::read_single(encap[1].content()).unwrap();
        let bags = elements(safe_contents.content());
        assert_eq!(bags.len(), 2);
        let bag = elements(bags[0].as_slice());
        assert_eq!(bag.len(), 3);
        assert_eq!(bag[0].content(), oid::CERT_BAG.0);
        assert_eq!(bag[1].identifier(), der::CTX_CONS_0);
        let cert_bag = elements(bag[1].content());
        assert_eq!(cert_bag[0].content(), oid::X509_CERTIFICATE.0);
        assert_eq!(cert_bag[1].identifier(), der::CTX_CONS_0);
        assert_eq!(
            der::read_single(cert_bag[1].content()).unwrap().content(),
            include_bytes!("../../test-data/role.der").as_ref()
        );
        assert_eq!(bag[2].identifier(), der::SET);
        let bag_attrs = elements(bag[2].as_slice());
        assert_eq!(bag_attrs.len(), 3);
        assert!(bag_attrs.windows(2).all(|pair| {
            pair[0].as_slice() <= pair[1].as_slice()
        }));
    }

    #[test]
    fn bag_attributes() {
        let cert = Cert::decode(
            include_bytes!("../../test-data/role.der").as_ref()
        ).unwrap();
        let mut input = SafeBagInput::new(cert.to_bytes());
        assert_eq!(input.attributes().unwrap().len(), 1);

        input.local_key_id = Some(Bytes::from_static(b"\x01\x02"));
        input.not_after = Some(time(2027, 1, 1, 0, 0, 0));
        let attrs = input.attributes().unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].decode_values()[0].value,
            "notBefore=0001-01-01 00:00:00, notAfter=2027-01-01 00:00:00"
        );
        assert_eq!(attrs[1].decode_values()[0].value, "0102");

        // Empty local key identifiers fall back to the certificate.
        input.local_key_id = Some(Bytes::new());
        assert_eq!(
            input.attributes().unwrap()[1].decode_values()[0].value,
            "15f961ef1f41e3a03c0e578df122457019dfa4b7"
        );

        input.not_before = Some(time(10000, 1, 1, 0, 0, 0));
        assert!(input.attributes().unwrap_err().is_time_out_of_range());
    }

    #[test]
    fn signer_attributes() {
        let attrs = SignerAttrs::default().attributes(b"\x00").unwrap();
        assert_eq!(attrs.len(), 2);

        let attrs = SignerAttrs {
            version: 2, .. Default::default()
        }.attributes(b"\x00").unwrap();
        assert_eq!(attrs.len(), 3);
        assert_eq!(
            attrs[2].decode_values()[0].value,
            "timestamp=0001-01-01T00:00:00Z, version=2"
        );
        assert_eq!(
            &attrs[2].values()[0][..19],
            b"\x30\x14\x18\x0f00010101000000Z"
        );
    }

    #[test]
    fn default_times() {
        let (signer, key, cert) = signer();
        let mut role = SafeBagInput::new(Bytes::from_static(
            include_bytes!("../../test-data/role.der")
        ));
        role.not_after = Some(time(2027, 1, 1, 0, 0, 0));
        let attrs = SignerAttrs { version: 2, .. Default::default() };
        let data = build_registry(
            &cert, &signer, &key, &[role], &attrs
        ).unwrap();

        let reg = Container::decode(&data).unwrap();
        assert!(reg.bag_infos()[0].attributes.iter().any(|attr| {
            attr.name == "roleValidityPeriod"
                && attr.value == "notBefore=0001-01-01 00:00:00, \
                                  notAfter=2027-01-01 00:00:00"
        }));
        assert!(reg.signer_attributes().iter().any(|attr| {
            attr.name == "VER"
                && attr.value == "timestamp=0001-01-01T00:00:00Z, version=2"
        }));
    }

    #[test]
    fn reject_long_years() {
        let (signer, key, cert) = signer();
        let attrs = SignerAttrs {
            version_time: Some(time(10000, 1, 1, 0, 0, 0)),
            .. attrs()
        };
        let err = build_registry(
            &cert, &signer, &key, &bags(), &attrs
        ).unwrap_err();
        assert!(err.is_time_out_of_range());
    }

    #[test]
    fn missing_key_identifier() {
        let (signer, key, _) = signer();
        let cert = Cert::decode(
            include_bytes!("../../test-data/noski.der").as_ref()
        ).unwrap();
        let err = build_registry(
            &cert, &signer, &key, &bags(), &attrs()
        ).unwrap_err();
        assert!(err.is_missing_subject_key_identifier());
    }

    #[test]
    fn missing_key_material() {
        let (signer, _, cert) = signer();
        let key = signer.create_key().unwrap();
        signer.destroy_key(&key).unwrap();
        let err = build_registry(
            &cert, &signer, &key, &bags(), &attrs()
        ).unwrap_err();
        assert!(err.is_missing_signer_key_material());

        // The key is checked before the certificate.
        let cert = Cert::decode(
            include_bytes!("../../test-data/noski.der").as_ref()
        ).unwrap();
        let err = build_registry(
            &cert, &signer, &key, &bags(), &attrs()
        ).unwrap_err();
        assert!(err.is_missing_signer_key_material());
    }

    #[test]
    fn invalid_bag_certificate() {
        let (signer, key, cert) = signer();
        let mut broken = SafeBagInput::new(
            Bytes::from_static(b"\x30\x03\x02\x01\x00")
        );
        broken.role_name = "Broken".into();
        let data = build_registry(
            &cert, &signer, &key, &[broken], &attrs()
        ).unwrap();

        let reg = Container::decode(&data).unwrap();
        assert_eq!(reg.bags().len(), 1);
        let bag = reg.bags()[0].cert_bag().unwrap();
        assert_eq!(bag.cert_value().as_ref(), b"\x30\x03\x02\x01\x00");
        assert!(bag.certificate().is_none());
        let info = &reg.bag_infos()[0];
        assert!(info.summary.is_none());
        assert_eq!(info.cert_len, 5);
        assert_eq!(info.role_name(), Some("Broken"));
        assert_eq!(info.attributes.len(), 1);
    }
}
