//! The object identifiers used in this crate.
//!
//! This module collects all the object indentifiers used at various places
//! in this crate in one central place. They are public so you can refer to
//! them should that ever become necessary.
//!
//! In addition, [`name`] maps the identifiers to the short names used when
//! displaying decoded values. The table is static and never changes at
//! runtime.

use bcder::{ConstOid, Oid};


//------------ Algorithms ----------------------------------------------------

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `id-sha256`
///
/// Identifies the SHA-256 one-way hash function.
pub const SHA256: ConstOid
    = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 1]);

/// [RFC 5758](https://tools.ietf.org/html/rfc5758) `ecdsa-with-SHA256`
///
/// Identifies ECDSA signatures using SHA-256 as the digest.
pub const ECDSA_WITH_SHA256: ConstOid
    = Oid(&[42, 134, 72, 206, 61, 4, 3, 2]);

/// [RFC 5480](https://tools.ietf.org/html/rfc5480) `id-ecPublicKey`
pub const EC_PUBLIC_KEY: ConstOid
    = Oid(&[42, 134, 72, 206, 61, 2, 1]);

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `rsaEncryption`
///
/// Identifies an RSA public key with no limitation to either RSASSA-PSS or
/// RSAES-OEAP.
pub const RSA_ENCRYPTION: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 1]);

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `sha256WithRSAEncryption`
pub const SHA256_WITH_RSA_ENCRYPTION: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 11]);

/// [RFC 8410](https://tools.ietf.org/html/rfc8410) `id-Ed25519`
pub const ED25519: ConstOid = Oid(&[43, 101, 112]);


//------------ CMS -----------------------------------------------------------

/// [RFC 5652](https://tools.ietf.org/html/rfc5652) `id-data`
pub const DATA: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 1]);

/// [RFC 5652](https://tools.ietf.org/html/rfc5652) `id-signedData`
pub const SIGNED_DATA: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 2]);

pub const CONTENT_TYPE: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 3]);
pub const MESSAGE_DIGEST: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 4]);
pub const SIGNING_TIME: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 5]);
pub const SMIME_CAPABILITIES: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 15]);


//------------ PKCS #12 ------------------------------------------------------

/// [RFC 2985](https://tools.ietf.org/html/rfc2985) `pkcs-9-at-friendlyName`
pub const FRIENDLY_NAME: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 20]);

/// [RFC 2985](https://tools.ietf.org/html/rfc2985) `pkcs-9-at-localKeyId`
pub const LOCAL_KEY_ID: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 21]);

/// [RFC 7292](https://tools.ietf.org/html/rfc7292) `x509Certificate`
///
/// The cert bag type for a DER encoded X.509 certificate.
pub const X509_CERTIFICATE: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 22, 1]);

/// [RFC 7292](https://tools.ietf.org/html/rfc7292) `sdsiCertificate`
pub const SDSI_CERTIFICATE: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 22, 2]);

pub const KEY_BAG: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 12, 10, 1, 1]);
pub const PKCS8_SHROUDED_KEY_BAG: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 12, 10, 1, 2]);

/// [RFC 7292](https://tools.ietf.org/html/rfc7292) `certBag`
pub const CERT_BAG: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 12, 10, 1, 3]);

pub const CRL_BAG: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 12, 10, 1, 4]);
pub const SECRET_BAG: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 12, 10, 1, 5]);
pub const SAFE_CONTENTS_BAG: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 12, 10, 1, 6]);


//------------ ATOM Registry Attributes --------------------------------------
//
// These live under the private enterprise arc 1.3.6.1.4.1.99999.1.

/// The vehicle identification number.
pub const ATOM_VIN: ConstOid
    = Oid(&[43, 6, 1, 4, 1, 134, 141, 31, 1, 1]);

/// The registry version: a timestamp and a version number.
pub const ATOM_VER: ConstOid
    = Oid(&[43, 6, 1, 4, 1, 134, 141, 31, 1, 2]);

/// The identifier of the user the registry was issued for.
pub const ATOM_UID: ConstOid
    = Oid(&[43, 6, 1, 4, 1, 134, 141, 31, 1, 3]);

/// The role name of a certificate in the registry.
pub const ATOM_ROLE_NAME: ConstOid
    = Oid(&[43, 6, 1, 4, 1, 134, 141, 31, 1, 4]);

/// The period during which a role is valid.
pub const ATOM_ROLE_VALIDITY_PERIOD: ConstOid
    = Oid(&[43, 6, 1, 4, 1, 134, 141, 31, 1, 5]);


//------------ X.509 ---------------------------------------------------------

pub const AT_COMMON_NAME: ConstOid = Oid(&[85, 4, 3]); // 2 5 4 3
pub const AT_SURNAME: ConstOid = Oid(&[85, 4, 4]);
pub const AT_SERIAL_NUMBER: ConstOid = Oid(&[85, 4, 5]); // 2 5 4 5
pub const AT_COUNTRY_NAME: ConstOid = Oid(&[85, 4, 6]);
pub const AT_LOCALITY_NAME: ConstOid = Oid(&[85, 4, 7]);
pub const AT_STATE_OR_PROVINCE_NAME: ConstOid = Oid(&[85, 4, 8]);
pub const AT_STREET_ADDRESS: ConstOid = Oid(&[85, 4, 9]);
pub const AT_ORGANIZATION_NAME: ConstOid = Oid(&[85, 4, 10]);
pub const AT_ORGANIZATIONAL_UNIT_NAME: ConstOid = Oid(&[85, 4, 11]);
pub const AT_EMAIL_ADDRESS: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 1]);

pub const CE_SUBJECT_KEY_IDENTIFIER: ConstOid = Oid(&[85, 29, 14]);


//------------ Names ---------------------------------------------------------

/// The short names of the object identifiers we know about.
static NAMES: &[(ConstOid, &str)] = &[
    (SHA256, "sha256"),
    (ECDSA_WITH_SHA256, "ecdsa-with-SHA256"),
    (EC_PUBLIC_KEY, "ECDSA"),
    (RSA_ENCRYPTION, "RSA"),
    (SHA256_WITH_RSA_ENCRYPTION, "sha256WithRSAEncryption"),
    (ED25519, "Ed25519"),
    (DATA, "pkcs7-data"),
    (SIGNED_DATA, "pkcs7-signedData"),
    (CONTENT_TYPE, "contentType"),
    (MESSAGE_DIGEST, "messageDigest"),
    (SIGNING_TIME, "signingTime"),
    (SMIME_CAPABILITIES, "smimeCapabilities"),
    (FRIENDLY_NAME, "friendlyName"),
    (LOCAL_KEY_ID, "localKeyID"),
    (X509_CERTIFICATE, "x509Certificate"),
    (SDSI_CERTIFICATE, "sdsiCertificate"),
    (KEY_BAG, "keyBag"),
    (PKCS8_SHROUDED_KEY_BAG, "pkcs8ShroudedKeyBag"),
    (CERT_BAG, "certBag"),
    (CRL_BAG, "crlBag"),
    (SECRET_BAG, "secretBag"),
    (SAFE_CONTENTS_BAG, "safeContentsBag"),
    (ATOM_VIN, "VIN"),
    (ATOM_VER, "VER"),
    (ATOM_UID, "UID"),
    (ATOM_ROLE_NAME, "roleName"),
    (ATOM_ROLE_VALIDITY_PERIOD, "roleValidityPeriod"),
];

/// The short names used for attribute types in distinguished names.
static NAME_ATTRIBUTES: &[(ConstOid, &str)] = &[
    (AT_COMMON_NAME, "CN"),
    (AT_SURNAME, "SN"),
    (AT_SERIAL_NUMBER, "SERIALNUMBER"),
    (AT_COUNTRY_NAME, "C"),
    (AT_LOCALITY_NAME, "L"),
    (AT_STATE_OR_PROVINCE_NAME, "ST"),
    (AT_STREET_ADDRESS, "STREET"),
    (AT_ORGANIZATION_NAME, "O"),
    (AT_ORGANIZATIONAL_UNIT_NAME, "OU"),
    (AT_EMAIL_ADDRESS, "emailAddress"),
];

/// Returns the short name of a known object identifier.
pub fn name<T: AsRef<[u8]>>(oid: &Oid<T>) -> Option<&'static str> {
    lookup(NAMES, oid)
}

/// Returns the short name of a distinguished name attribute type.
pub fn name_attribute<T: AsRef<[u8]>>(oid: &Oid<T>) -> Option<&'static str> {
    lookup(NAME_ATTRIBUTES, oid)
}

/// Returns the short name of an identifier or its dotted form.
pub fn display<T: AsRef<[u8]>>(oid: &Oid<T>) -> String {
    match name(oid) {
        Some(name) => name.into(),
        None => oid.to_string(),
    }
}

/// Returns the display name of a cert bag’s certificate type.
pub fn cert_type_name<T: AsRef<[u8]>>(oid: &Oid<T>) -> String {
    if *oid == X509_CERTIFICATE {
        "X.509 Certificate".into()
    }
    else if *oid == SDSI_CERTIFICATE {
        "SDSI Certificate".into()
    }
    else {
        oid.to_string()
    }
}

fn lookup<T: AsRef<[u8]>>(
    table: &'static [(ConstOid, &'static str)],
    oid: &Oid<T>,
) -> Option<&'static str> {
    table.iter().find_map(|(known, name)| {
        if known.0 == oid.0.as_ref() { Some(*name) }
        else { None }
    })
}


//============ Tests =========================================================
