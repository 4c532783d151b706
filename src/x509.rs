//! Types common to all things X.509.
//!
//! Certificates appear in both container formats but their content is not
//! the subject of this crate. Consequently, the [`Cert`] type here is a
//! lenient reader that extracts only what is needed to identify and
//! describe a certificate: serial number, issuer and subject names, the
//! validity period, the public key algorithm, and the subject key
//! identifier. The complete encoding is kept alongside.

use std::{error, fmt, io, ops, str};
use std::str::FromStr;
use bcder::decode;
use bcder::{Captured, Mode, OctetString, Oid, Tag};
use bcder::decode::{ContentError, DecodeError, IntoSource, Source};
use bcder::encode::{self, PrimitiveContent};
use bytes::Bytes;
use chrono::{
    DateTime, Datelike, LocalResult, NaiveDateTime, SecondsFormat,
    TimeZone, Timelike, Utc,
};
use crate::{der, oid};
use crate::util::hex;


//------------ Cert ----------------------------------------------------------

/// An X.509 certificate.
#[derive(Clone, Debug)]
pub struct Cert {
    /// The complete encoding of the certificate.
    raw: Bytes,

    serial: Serial,
    issuer: Name,
    validity: Validity,
    subject: Name,

    /// The algorithm of the subject public key.
    key_algorithm: Oid<Bytes>,

    /// The value of the subject key identifier extension if present.
    subject_key_id: Option<Bytes>,
}

impl Cert {
    /// Decodes a source as a certificate.
    pub fn decode<S: IntoSource>(
        source: S
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    /// Takes an encoded certificate from the beginning of a value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let raw = cons.capture_one()?;
        let bytes = raw.clone().into_bytes();
        raw.decode(|cons| {
            cons.take_sequence(|cons| Self::from_constructed(cons, bytes))
        }).map_err(DecodeError::convert)
    }

    /// Parses the content of a Certificate sequence.
    fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        raw: Bytes,
    ) -> Result<Self, DecodeError<S::Error>> {
        let res = cons.take_sequence(|cons| { // tbsCertificate
            // version [0] EXPLICIT Version DEFAULT v1
            cons.take_opt_constructed_if(Tag::CTX_0, |c| c.take_u8())?;
            let serial = Serial::take_from(cons)?;
            cons.take_sequence(|cons| cons.skip_all())?; // signature
            let issuer = Name::take_from(cons)?;
            let validity = Validity::take_from(cons)?;
            let subject = Name::take_from(cons)?;
            let key_algorithm = cons.take_sequence(|cons| { // spki
                let alg = cons.take_sequence(|cons| {
                    let alg = Oid::take_from(cons)?;
                    cons.skip_all()?;
                    Ok(alg)
                })?;
                cons.skip_all()?;
                Ok(alg)
            })?;
            // issuerUniqueID and subjectUniqueID
            cons.take_opt_value_if(Tag::CTX_1, der::take_content)?;
            cons.take_opt_value_if(Tag::CTX_2, der::take_content)?;

            let mut subject_key_id = None;
            cons.take_opt_constructed_if(Tag::CTX_3, |c| c.take_sequence(|cons| {
                while let Some(()) = cons.take_opt_sequence(|cons| {
                    let id = Oid::take_from(cons)?;
                    let _critical = cons.take_opt_bool()?;
                    let value = OctetString::take_from(cons)?;
                    if id == oid::CE_SUBJECT_KEY_IDENTIFIER {
                        Self::take_subject_key_identifier(
                            value, &mut subject_key_id
                        ).map_err(|err| cons.content_err(err))?;
                    }
                    Ok(())
                })? { }
                Ok(())
            }))?;
            Ok(Cert {
                raw, serial, issuer, validity, subject, key_algorithm,
                subject_key_id,
            })
        })?;
        cons.skip_all()?; // signatureAlgorithm, signatureValue
        Ok(res)
    }

    /// Parses the Subject Key Identifier extension.
    ///
    /// The extension value is an OCTET STRING. We don’t insist on a
    /// particular length.
    fn take_subject_key_identifier(
        value: OctetString,
        subject_key_id: &mut Option<Bytes>,
    ) -> Result<(), ContentError> {
        if subject_key_id.is_some() {
            return Err(ContentError::from_static(
                "duplicate Subject Key Identifier extension"
            ))
        }
        let key_id = Mode::Der.decode(value, OctetString::take_from).map_err(|_| {
            ContentError::from_static("invalid Subject Key Identifier")
        })?;
        *subject_key_id = Some(key_id.into_bytes());
        Ok(())
    }

    /// Returns the complete encoding of the certificate.
    pub fn as_slice(&self) -> &[u8] {
        self.raw.as_ref()
    }

    pub fn to_bytes(&self) -> Bytes {
        self.raw.clone()
    }

    pub fn serial_number(&self) -> Serial {
        self.serial
    }

    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    pub fn subject(&self) -> &Name {
        &self.subject
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn key_algorithm(&self) -> &Oid<Bytes> {
        &self.key_algorithm
    }

    pub fn subject_key_identifier(&self) -> Option<&[u8]> {
        self.subject_key_id.as_ref().map(AsRef::as_ref)
    }

    /// Returns a summary of the certificate for display.
    pub fn summary(&self) -> CertSummary {
        CertSummary {
            subject: self.subject.to_string(),
            issuer: self.issuer.to_string(),
            serial: self.serial.to_string(),
            not_before: self.validity.not_before().to_date_string(),
            not_after: self.validity.not_after().to_date_string(),
            key_algorithm: oid::display(&self.key_algorithm),
            subject_key_id: self.subject_key_id.as_ref().map(|id| {
                hex::encode_string(id)
            }).unwrap_or_default(),
        }
    }
}


//--- PartialEq and Eq

impl PartialEq for Cert {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Cert { }


//------------ CertSummary ---------------------------------------------------

/// The description of a certificate handed to presentation code.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CertSummary {
    pub subject: String,
    pub issuer: String,

    /// The serial number in lowercase hex.
    pub serial: String,

    /// The start of the validity period as `YYYY-MM-DD`.
    pub not_before: String,

    /// The end of the validity period as `YYYY-MM-DD`.
    pub not_after: String,

    /// The name of the public key algorithm.
    pub key_algorithm: String,

    /// The subject key identifier in hex or empty if there is none.
    pub subject_key_id: String,
}


//------------ Name ----------------------------------------------------------

/// A distinguished name.
///
/// The value keeps the captured encoding of the name. Its `Display`
/// implementation renders the relative distinguished names in reverse order
/// as `TYPE=value` separated by commas, similar to RFC 4514.
#[derive(Clone, Debug)]
pub struct Name(Captured);

impl Name {
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.capture(|cons| {
            cons.take_sequence(|cons| { // RDNSequence
                while let Some(()) = cons.take_opt_set(|cons| {
                    while let Some(()) = cons.take_opt_sequence(|cons| {
                        Oid::skip_in(cons)?;
                        if cons.skip_one()?.is_none() {
                            return Err(cons.content_err("invalid name"))
                        }
                        Ok(())
                    })? { }
                    Ok(())
                })? { }
                Ok(())
            })
        }).map(Name)
    }

    /// Returns the complete encoding of the name.
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Returns the attribute type and value of all name components.
    ///
    /// The components are returned in encoding order. Values are the
    /// complete encoding of the attribute value.
    pub fn components(&self) -> Vec<(Oid<Bytes>, Bytes)> {
        let mut res = Vec::new();
        let _ = self.0.clone().decode(|cons| {
            cons.take_sequence(|cons| {
                while let Some(()) = cons.take_opt_set(|cons| {
                    while let Some(()) = cons.take_opt_sequence(|cons| {
                        let oid = Oid::take_from(cons)?;
                        let value = cons.capture_one()?;
                        res.push((oid, value.into_bytes()));
                        Ok(())
                    })? { }
                    Ok(())
                })? { }
                Ok(())
            })
        });
        res
    }
}


//--- PartialEq and Eq

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice() == other.0.as_slice()
    }
}

impl Eq for Name {}


//--- Display

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (idx, (oid, value)) in self.components().iter().rev().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            match oid::name_attribute(oid) {
                Some(name) => f.write_str(name)?,
                None => write!(f, "{}", oid)?,
            }
            f.write_str("=")?;
            let text = der::read_single(value).ok().and_then(|tlv| {
                der::decode_string(&tlv)
            });
            match text {
                Some(text) => {
                    for ch in text.chars() {
                        if matches!(
                            ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';'
                        ) {
                            f.write_str("\\")?;
                        }
                        write!(f, "{}", ch)?;
                    }
                }
                None => write!(f, "#{}", hex::encode_string(value))?,
            }
        }
        Ok(())
    }
}


//------------ Serial --------------------------------------------------------

/// A certificate serial number.
///
/// Serial numbers are kept as a fixed-width, zero-padded, 32 octet
/// big-endian magnitude. Two serial numbers encoded with a different number
/// of leading zero octets therefore compare equal. The sign of the encoded
/// integer is ignored, i.e., a negative serial number is treated as its
/// two’s complement octets read as an unsigned value.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Serial([u8; 32]);

impl Serial {
    /// Creates a serial number from the content of an INTEGER.
    ///
    /// Leading zero octets are ignored. The remaining value must not be
    /// longer than 32 octets.
    pub fn from_slice(s: &[u8]) -> Result<Self, SerialSliceError> {
        let start = s.iter().take_while(|&&x| x == 0).count();
        let s = &s[start..];
        if s.len() > 32 {
            return Err(SerialSliceError)
        }
        let mut res = [0u8; 32];
        res[32 - s.len()..].copy_from_slice(s);
        Ok(Serial(res))
    }

    /// Takes an encoded serial number from the beginning of a value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive_if(Tag::INTEGER, |prim| {
            let content = prim.take_all()?;
            Serial::from_slice(&content).map_err(|_| {
                prim.content_err("invalid serial number")
            })
        })
    }

    /// Returns the fixed-width representation.
    pub fn into_array(self) -> [u8; 32] {
        self.0
    }

    /// Returns the octets of the magnitude without leading zeros.
    ///
    /// A zero serial number returns a single zero octet.
    pub fn magnitude(&self) -> &[u8] {
        let start = self.0.iter().take_while(|&&x| x == 0).count();
        &self.0[start.min(31)..]
    }
}


//--- From

impl From<u64> for Serial {
    fn from(value: u64) -> Self {
        let mut res = [0u8; 32];
        res[24..].copy_from_slice(&value.to_be_bytes());
        Serial(res)
    }
}


//--- Display and Debug

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode_string(self.magnitude()))
    }
}

impl fmt::Debug for Serial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Serial({})", self)
    }
}


//------------ Time ----------------------------------------------------------

/// Seconds from 0001-01-01T00:00:00Z to the Unix epoch.
const ZERO_TIMESTAMP: i64 = -62_135_596_800;

/// A point in time as used in certificates and registry attributes.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Time(DateTime<Utc>);

impl Time {
    pub fn new(dt: DateTime<Utc>) -> Self {
        Time(dt)
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Returns midnight of January 1 of the year 1.
    ///
    /// Registries use this time where a time is required but none was
    /// given.
    pub fn zero() -> Self {
        Self::new(
            DateTime::<Utc>::from_timestamp(ZERO_TIMESTAMP, 0)
                .unwrap_or_default()
        )
    }

    /// Returns whether the time can be encoded as a GeneralizedTime.
    ///
    /// The format only allows years with exactly four digits.
    pub fn is_generalized_time(self) -> bool {
        (0..=9999).contains(&self.0.year())
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive(|tag, prim| {
            match tag {
                Tag::UTC_TIME => {
                    // RFC 5280 requires the format YYMMDDHHMMSSZ
                    let year = read_two_char(prim)? as i32;
                    let year = if year >= 50 { year + 1900 }
                               else { year + 2000 };
                    let res = (
                        year,
                        read_two_char(prim)?,
                        read_two_char(prim)?,
                        read_two_char(prim)?,
                        read_two_char(prim)?,
                        read_two_char(prim)?,
                    );
                    if prim.take_u8()? != b'Z' {
                        return Err(prim.content_err(
                            "malformed time value"
                        ))
                    }
                    Self::from_parts(res).map_err(|err| prim.content_err(err))
                }
                Tag::GENERALIZED_TIME => {
                    // RFC 5280 requires the format YYYYMMDDHHMMSSZ
                    let res = (
                        read_four_char(prim)? as i32,
                        read_two_char(prim)?,
                        read_two_char(prim)?,
                        read_two_char(prim)?,
                        read_two_char(prim)?,
                        read_two_char(prim)?,
                    );
                    if prim.take_u8()? != b'Z' {
                        return Err(prim.content_err(
                            "malformed time value"
                        ))
                    }
                    Self::from_parts(res).map_err(|err| prim.content_err(err))
                }
                _ => {
                    Err(prim.content_err("malformed time value"))
                }
            }
        })
    }

    fn from_parts(
        parts: (i32, u32, u32, u32, u32, u32)
    ) -> Result<Self, ContentError> {
        match Utc.with_ymd_and_hms(
            parts.0, parts.1, parts.2, parts.3, parts.4, parts.5
        ) {
            LocalResult::Single(dt) => Ok(Time(dt)),
            _ => Err(ContentError::from_static("malformed time value"))
        }
    }

    /// Parses the content of a GeneralizedTime.
    ///
    /// Accepts both `YYYYMMDDHHMMSSZ` and the variant with fractional
    /// seconds `YYYYMMDDHHMMSS.fffZ`.
    pub fn parse_generalized(s: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%SZ").or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%S%.fZ")
        }).ok().map(|dt| Time(dt.and_utc()))
    }

    /// Returns the date as `YYYY-MM-DD`.
    pub fn to_date_string(self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// Returns date and time as `YYYY-MM-DD HH:MM:SS`.
    pub fn to_datetime_string(self) -> String {
        self.0.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Returns the time in RFC 3339 format, e.g., `2026-01-15T17:40:21Z`.
    pub fn to_rfc3339(self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn encode_generalized_time(self) -> impl encode::Values {
        GeneralizedTime(self).encode()
    }
}


//--- Deref and AsRef

impl ops::Deref for Time {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<DateTime<Utc>> for Time {
    fn as_ref(&self) -> &DateTime<Utc> {
        &self.0
    }
}


//--- From

impl From<DateTime<Utc>> for Time {
    fn from(time: DateTime<Utc>) -> Self {
        Time(time)
    }
}


fn read_two_char<S: decode::Source>(
    source: &mut S
) -> Result<u32, DecodeError<S::Error>> {
    let mut s = [0u8; 2];
    s[0] = source.take_u8()?;
    s[1] = source.take_u8()?;
    let s = match str::from_utf8(&s[..]) {
        Ok(s) => s,
        Err(_err) => {
            return Err(source.content_err("malformed time value"))
        }
    };
    u32::from_str(s).map_err(|_err| {
        source.content_err("malformed time value")
    })
}

fn read_four_char<S: decode::Source>(
    source: &mut S
) -> Result<u32, DecodeError<S::Error>> {
    let mut s = [0u8; 4];
    s[0] = source.take_u8()?;
    s[1] = source.take_u8()?;
    s[2] = source.take_u8()?;
    s[3] = source.take_u8()?;
    let s = match str::from_utf8(&s[..]) {
        Ok(s) => s,
        Err(_err) => {
            return Err(source.content_err("malformed time value"))
        }
    };
    u32::from_str(s).map_err(|_err| {
        source.content_err("malformed time value")
    })
}


//------------ GeneralizedTime -----------------------------------------------

pub struct GeneralizedTime(Time);

impl GeneralizedTime {
    /// Returns the content octets, normally `yyyyMMddhhmmssZ`.
    ///
    /// Years outside of 0 to 9999 don’t have four digits and result in
    /// content that doesn’t decode again.
    fn to_content(&self) -> String {
        format!(
            "{:04}{:02}{:02}{:02}{:02}{:02}Z",
            self.0.year(), self.0.month(), self.0.day(),
            self.0.hour(), self.0.minute(), self.0.second()
        )
    }
}

impl PrimitiveContent for GeneralizedTime {
    const TAG: Tag = Tag::GENERALIZED_TIME;

    fn encoded_len(&self, _: Mode) -> usize {
        self.to_content().len()
    }

    fn write_encoded<W: io::Write>(
        &self, _: Mode, target: &mut W
    ) -> Result<(), io::Error> {
        target.write_all(self.to_content().as_bytes())
    }
}


//------------ Validity ------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Validity {
    not_before: Time,
    not_after: Time,
}

impl Validity {
    pub fn new(not_before: Time, not_after: Time) -> Self {
        Validity { not_before, not_after }
    }

    pub fn not_before(self) -> Time {
        self.not_before
    }

    pub fn not_after(self) -> Time {
        self.not_after
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            Ok(Validity::new(
                Time::take_from(cons)?,
                Time::take_from(cons)?,
            ))
        })
    }
}


//------------ SerialSliceError ----------------------------------------------

/// A serial number was longer than 32 octets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SerialSliceError;

impl fmt::Display for SerialSliceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("serial number longer than 32 bytes")
    }
}

impl error::Error for SerialSliceError { }



//------------ Testing. One. Two. Three --------------------------------------
