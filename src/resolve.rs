//! Finding the certificate of a signer.
//!
//! A signer info identifies the certificate of its signer either by the
//! subject key identifier or by issuer and serial number. Resolution
//! happens in two stages, the first match wins:
//!
//! 1. If the signer identifier is a subject key identifier, the first
//!    certificate with an identical subject key identifier is chosen.
//!
//! 2. Otherwise, or if there was no match, a serial number is extracted
//!    from the identifier and compared to the serial numbers of all
//!    certificates. If the identifier doesn’t decode as an issuer and
//!    serial number, the last INTEGER of plausible length found anywhere in
//!    its octets is used instead.
//!
//! Serial numbers are compared in their normalized form, so different
//! numbers of leading zero octets don’t matter.
//!
//! Not finding a certificate is not an error. The certificate may well be
//! provided elsewhere.

use crate::der;
use crate::cms::SignerIdentifier;
use crate::x509::{Cert, Serial};


/// The longest serial number accepted by the fallback scan.
const MAX_SERIAL_LEN: usize = 32;


/// Returns the index of the signer’s certificate in `certs`.
pub fn resolve_signer<'a, I>(sid: &SignerIdentifier, certs: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a Cert>,
    I::IntoIter: Clone,
{
    let certs = certs.into_iter();
    if let Some(key_id) = sid.key_identifier() {
        if let Some(idx) = certs.clone().position(|cert| {
            cert.subject_key_identifier() == Some(key_id)
        }) {
            return Some(idx)
        }
    }
    let serial = serial_number(sid)?;
    certs.clone().position(|cert| cert.serial_number() == serial)
}

/// Extracts the serial number from a signer identifier.
///
/// A properly encoded issuer and serial number is decoded. Anything else is
/// searched for the last INTEGER between one and 32 octets long.
pub fn serial_number(sid: &SignerIdentifier) -> Option<Serial> {
    if let Some((_, serial)) = sid.issuer_and_serial() {
        return Some(serial)
    }
    scan_serial(sid.as_slice())
}

/// Returns the last plausible serial number found in `data`.
///
/// Every offset is tried as the start of an INTEGER.
pub fn scan_serial(data: &[u8]) -> Option<Serial> {
    let mut res = None;
    for start in 0..data.len() {
        if data[start] != der::INTEGER {
            continue
        }
        if let Ok((tlv, _)) = der::read_tlv(&data[start..]) {
            if (1..=MAX_SERIAL_LEN).contains(&tlv.len()) {
                if let Ok(serial) = Serial::from_slice(tlv.content()) {
                    res = Some(serial)
                }
            }
        }
    }
    res
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use super::*;

    fn certs() -> Vec<Cert> {
        vec![
            Cert::decode(
                include_bytes!("../test-data/noski.der").as_ref()
            ).unwrap(),
            Cert::decode(
                include_bytes!("../test-data/role.der").as_ref()
            ).unwrap(),
            Cert::decode(
                include_bytes!("../test-data/signer.der").as_ref()
            ).unwrap(),
        ]
    }

    fn key_id(value: &'static [u8]) -> SignerIdentifier {
        SignerIdentifier::SubjectKeyIdentifier(Bytes::from_static(value))
    }

    fn issuer_and_serial(value: &'static [u8]) -> SignerIdentifier {
        SignerIdentifier::IssuerAndSerialNumber(Bytes::from_static(value))
    }

    #[test]
    fn by_key_identifier() {
        let certs = certs();
        let bare = key_id(
            b"\x27\x69\x75\x20\xba\x1f\x7e\xd1\xff\xf3\
              \x1d\x9d\x55\x16\x81\xcd\x01\xe8\x7e\x7d"
        );
        assert_eq!(resolve_signer(&bare, &certs), Some(2));
        let wrapped = key_id(
            b"\x04\x14\x27\x69\x75\x20\xba\x1f\x7e\xd1\xff\xf3\
              \x1d\x9d\x55\x16\x81\xcd\x01\xe8\x7e\x7d"
        );
        assert_eq!(resolve_signer(&wrapped, &certs), Some(2));
        assert_eq!(resolve_signer(&key_id(b"\x01\x02\x03"), &certs), None);
    }

    #[test]
    fn by_serial_number() {
        let certs = certs();
        // role.der has serial 0x0100.
        let sid = issuer_and_serial(b"\x30\x06\x30\x00\x02\x02\x01\x00");
        assert_eq!(resolve_signer(&sid, &certs), Some(1));

        // Same number with a redundant leading zero.
        let sid = issuer_and_serial(b"\x30\x07\x30\x00\x02\x03\x00\x01\x00");
        assert_eq!(resolve_signer(&sid, &certs), Some(1));

        // noski.der has serial 0x7f.
        let sid = issuer_and_serial(b"\x30\x05\x30\x00\x02\x01\x7f");
        assert_eq!(resolve_signer(&sid, &certs), Some(0));

        let sid = issuer_and_serial(b"\x30\x05\x30\x00\x02\x01\x55");
        assert_eq!(resolve_signer(&sid, &certs), None);
    }

    #[test]
    fn fallback_scan() {
        let certs = certs();
        // Not a valid issuer and serial number: the issuer isn’t a name.
        let sid = issuer_and_serial(
            b"\x30\x0b\x02\x01\x7f\x04\x01\x00\x02\x03\x00\x10\x01"
        );
        assert!(sid.issuer_and_serial().is_none());
        assert_eq!(serial_number(&sid), Some(Serial::from(0x1001)));
        assert_eq!(resolve_signer(&sid, &certs), Some(2));

        // A key identifier that doesn’t match falls back to the scan, too.
        let sid = key_id(b"\x04\x05\x99\x99\x02\x01\x7f");
        assert_eq!(resolve_signer(&sid, &certs), Some(0));

        assert_eq!(scan_serial(b""), None);
        assert_eq!(scan_serial(b"\x02\x00"), None);
        assert_eq!(scan_serial(b"\x02\x05\x01"), None);
    }
}
