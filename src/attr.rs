//! Attributes and their values.
//!
//! Attributes appear in two places: as the signed and unsigned attributes
//! of a signer info and as the attributes of a safe bag. Both times they
//! are a SET OF the following:
//!
//! ```txt
//! Attribute ::= SEQUENCE {
//!     attrType    OBJECT IDENTIFIER,
//!     attrValues  SET OF AttributeValue }
//! ```
//!
//! The meaning of the values is determined by the attribute type only. We
//! keep every value as its complete encoding and decide how to display it
//! by looking up the type in a static table of [`AttrShape`]s.
//!
//! When writing a set of attributes, DER requires the elements to be
//! ordered by their encoding. [`encode_set`] and [`sort_canonical`] take
//! care of that.

use bcder::{decode, encode};
use bcder::{ConstOid, Mode, Oid};
use bcder::decode::{DecodeError, IntoSource, Source};
use bcder::encode::{PrimitiveContent, Values};
use bytes::Bytes;
use crate::{der, oid};
use crate::error::{Element, ElementError};
use crate::util::hex;
use crate::x509::Time;


//------------ Attribute -----------------------------------------------------

/// A single attribute with all its values.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    attr_type: Oid<Bytes>,

    /// The complete encoding of each value.
    values: Vec<Bytes>,
}

/// # Decoding and Inspecting
///
impl Attribute {
    pub fn decode<S: IntoSource>(
        source: S
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let attr_type = Oid::take_from(cons)?;
            let raw = cons.take_set(|cons| cons.capture_all())?;
            let mut values = Vec::new();
            for item in der::elements(raw.as_slice()) {
                let tlv = item.map_err(|err| cons.content_err(err))?;
                values.push(Bytes::copy_from_slice(tlv.as_slice()));
            }
            Ok(Attribute { attr_type, values })
        })
    }

    pub fn attr_type(&self) -> &Oid<Bytes> {
        &self.attr_type
    }

    /// Returns the complete encodings of the values.
    pub fn values(&self) -> &[Bytes] {
        &self.values
    }

    /// Returns how values of this attribute are to be interpreted.
    pub fn shape(&self) -> AttrShape {
        AttrShape::for_type(&self.attr_type)
    }

    /// Decodes all values for display.
    pub fn decode_values(&self) -> Vec<AttrValue> {
        let shape = self.shape();
        let name = oid::display(&self.attr_type);
        self.values.iter().map(|value| {
            AttrValue {
                oid: self.attr_type.to_string(),
                name: name.clone(),
                value: shape.display(value),
                raw_hex: hex::encode_string(value),
            }
        }).collect()
    }

    /// Returns the first value decoded as text.
    ///
    /// This is used for the string-valued attributes such as the role
    /// name.
    pub fn text(&self) -> Option<String> {
        self.values.first().map(|value| AttrShape::Text.display(value))
    }
}

/// # Creating Attributes
///
/// The constructors produce single-valued attributes with value encodings
/// as used by registries.
impl Attribute {
    pub fn new(attr_type: Oid<Bytes>, values: Vec<Bytes>) -> Self {
        Attribute { attr_type, values }
    }

    fn single(attr_type: ConstOid, value: impl Into<Bytes>) -> Self {
        Attribute {
            attr_type: Oid(Bytes::from_static(attr_type.0)),
            values: vec![value.into()],
        }
    }

    /// Creates an attribute with a UTF8String value.
    pub fn utf8_string(attr_type: ConstOid, value: &str) -> Self {
        Self::single(attr_type, der::wrap_tag(der::UTF8_STRING, value.as_bytes()))
    }

    /// Creates an attribute with an OCTET STRING value.
    pub fn octet_string(attr_type: ConstOid, value: &[u8]) -> Self {
        Self::single(attr_type, der::wrap_tag(der::OCTET_STRING, value))
    }

    /// Creates a content type attribute.
    pub fn content_type(content_type: ConstOid) -> Self {
        Self::single(
            oid::CONTENT_TYPE,
            content_type.encode().to_captured(Mode::Der).into_bytes()
        )
    }

    /// Creates a message digest attribute.
    pub fn message_digest(digest: &[u8]) -> Self {
        Self::octet_string(oid::MESSAGE_DIGEST, digest)
    }

    /// Creates the version attribute.
    ///
    /// The value is a `SEQUENCE { GeneralizedTime, INTEGER }`.
    pub fn version(timestamp: Time, version: i64) -> Self {
        let version = der::encode_integer(version);
        let value = encode::sequence((
            timestamp.encode_generalized_time(),
            der::Raw(&version),
        )).to_captured(Mode::Der).into_bytes();
        Self::single(oid::ATOM_VER, value)
    }

    /// Creates the role validity period attribute.
    ///
    /// The value is a `SEQUENCE` of two GeneralizedTime values.
    pub fn validity_period(not_before: Time, not_after: Time) -> Self {
        Self::single(
            oid::ATOM_ROLE_VALIDITY_PERIOD,
            encode::sequence((
                not_before.encode_generalized_time(),
                not_after.encode_generalized_time(),
            )).to_captured(Mode::Der).into_bytes()
        )
    }

    /// Returns the complete encoding of the attribute.
    ///
    /// The values are placed into DER order.
    pub fn to_der(&self) -> Bytes {
        let mut values: Vec<&[u8]> = self.values.iter().map(|value| {
            value.as_ref()
        }).collect();
        der::sort_set_of(&mut values);
        let res = encode::sequence((
            self.attr_type.encode_ref(),
            encode::set(der::RawList(&values)),
        )).to_captured(Mode::Der).into_bytes();
        res
    }
}


//------------ AttrShape -----------------------------------------------------

/// The ways attribute values are interpreted.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AttrShape {
    /// A character string.
    Text,

    /// A `SEQUENCE { GeneralizedTime, INTEGER }`.
    Version,

    /// A `SEQUENCE` of two GeneralizedTime values.
    ValidityPeriod,

    /// A digest in an OCTET STRING.
    Digest,

    /// An object identifier naming a content type.
    ContentType,

    /// An OCTET STRING key identifier, possibly a UUID.
    KeyId,

    /// A BMPString or other character string.
    FriendlyName,

    /// A UTCTime or GeneralizedTime.
    Time,

    /// Anything else.
    Generic,
}

static SHAPES: &[(ConstOid, AttrShape)] = &[
    (oid::ATOM_VIN, AttrShape::Text),
    (oid::ATOM_UID, AttrShape::Text),
    (oid::ATOM_ROLE_NAME, AttrShape::Text),
    (oid::ATOM_VER, AttrShape::Version),
    (oid::ATOM_ROLE_VALIDITY_PERIOD, AttrShape::ValidityPeriod),
    (oid::MESSAGE_DIGEST, AttrShape::Digest),
    (oid::CONTENT_TYPE, AttrShape::ContentType),
    (oid::LOCAL_KEY_ID, AttrShape::KeyId),
    (oid::FRIENDLY_NAME, AttrShape::FriendlyName),
    (oid::SIGNING_TIME, AttrShape::Time),
];

impl AttrShape {
    /// Returns the shape for an attribute type.
    pub fn for_type<T: AsRef<[u8]>>(attr_type: &Oid<T>) -> Self {
        SHAPES.iter().find_map(|(known, shape)| {
            if known.0 == attr_type.0.as_ref() { Some(*shape) }
            else { None }
        }).unwrap_or(AttrShape::Generic)
    }

    /// Returns the display string for the complete encoding of a value.
    ///
    /// This never fails. Values that don’t have the expected structure are
    /// shown as text or hex, whatever seems more appropriate.
    pub fn display(self, value: &[u8]) -> String {
        match self {
            AttrShape::Text => display_text(value),
            AttrShape::Version => {
                display_version(value).unwrap_or_else(|| {
                    hex::encode_string(value)
                })
            }
            AttrShape::ValidityPeriod => {
                display_validity(value).unwrap_or_else(|| {
                    hex::encode_string(value)
                })
            }
            AttrShape::Digest => {
                hex::encode_string(der::unwrap_primitive(
                    value, der::OCTET_STRING
                ))
            }
            AttrShape::ContentType => {
                display_content_type(value).unwrap_or_else(|| {
                    hex::encode_string(value)
                })
            }
            AttrShape::KeyId => {
                format_key_id(der::unwrap_primitive(value, der::OCTET_STRING))
            }
            AttrShape::FriendlyName => display_friendly_name(value),
            AttrShape::Time => {
                Mode::Der.decode(value, Time::take_from).map(|time| {
                    time.to_rfc3339()
                }).unwrap_or_else(|_| hex::encode_string(value))
            }
            AttrShape::Generic => {
                der::read_single(value).ok().and_then(|tlv| {
                    der::decode_string(&tlv)
                }).unwrap_or_else(|| hex::encode_string(value))
            }
        }
    }
}

fn display_text(value: &[u8]) -> String {
    match der::read_single(value) {
        Ok(tlv) => {
            der::decode_string(&tlv).unwrap_or_else(|| {
                String::from_utf8_lossy(tlv.content()).into_owned()
            })
        }
        Err(_) => String::from_utf8_lossy(value).into_owned()
    }
}

fn display_version(value: &[u8]) -> Option<String> {
    let seq = der::read_single(value).ok()?;
    if seq.identifier() != der::SEQUENCE {
        return None
    }
    let mut elements = der::elements(seq.content());
    let time = elements.next()?.ok()?;
    let version = elements.next()?.ok()?;
    if version.identifier() != der::INTEGER {
        return None
    }
    let version = der::decode_integer(version.content())?;
    let time = String::from_utf8_lossy(time.content());
    match Time::parse_generalized(&time) {
        Some(parsed) => Some(format!(
            "timestamp={}, version={}", parsed.to_rfc3339(), version
        )),
        None => Some(format!("timestamp={}, version={}", time, version))
    }
}

fn display_validity(value: &[u8]) -> Option<String> {
    let seq = der::read_single(value).ok()?;
    if seq.identifier() != der::SEQUENCE {
        return None
    }
    let mut elements = der::elements(seq.content());
    let mut take_time = || {
        let tlv = elements.next()?.ok()?;
        if tlv.identifier() != der::GENERALIZED_TIME {
            return None
        }
        Time::parse_generalized(std::str::from_utf8(tlv.content()).ok()?)
    };
    let not_before = take_time()?;
    let not_after = take_time()?;
    Some(format!(
        "notBefore={}, notAfter={}",
        not_before.to_datetime_string(), not_after.to_datetime_string()
    ))
}

fn display_content_type(value: &[u8]) -> Option<String> {
    let content_type = Mode::Der.decode(value, Oid::take_from).ok()?;
    if content_type == oid::DATA {
        Some("pkcs7-data".into())
    }
    else {
        Some(content_type.to_string())
    }
}

fn display_friendly_name(value: &[u8]) -> String {
    match der::read_single(value) {
        Ok(tlv) if tlv.identifier() == der::BMP_STRING => {
            der::decode_bmp(tlv.content())
        }
        _ => display_text(value)
    }
}

/// Formats a local key identifier.
///
/// Identifiers of exactly 16 octets are shown as a UUID, everything else
/// as hex.
pub fn format_key_id(key_id: &[u8]) -> String {
    match uuid::Uuid::from_slice(key_id) {
        Ok(uuid) => uuid.to_string(),
        _ => hex::encode_string(key_id)
    }
}


//------------ AttrValue -----------------------------------------------------

/// A single attribute value prepared for display.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttrValue {
    /// The attribute type in dotted notation.
    pub oid: String,

    /// The short name of the attribute type or the dotted notation.
    pub name: String,

    /// The decoded value.
    pub value: String,

    /// The complete encoding of the value in hex.
    pub raw_hex: String,
}


//------------ Sets ----------------------------------------------------------

/// Decodes a SET OF Attribute.
///
/// The data may be either the complete encoding of the set or only its
/// content. Each element is decoded separately and an element that fails
/// to decode results in an error for that element only. If the framing of
/// the set itself is broken, decoding stops at that point.
pub fn decode_set(data: &[u8]) -> Vec<Result<Attribute, ElementError>> {
    let data = der::recover_tlv(data, der::SET);
    let content = match der::read_single(&data) {
        Ok(tlv) => tlv.content(),
        Err(err) => {
            return vec![Err(ElementError::new(Element::Attribute, 0, err))]
        }
    };
    der::elements(content).enumerate().map(|(index, item)| {
        let tlv = item.map_err(|err| {
            ElementError::new(Element::Attribute, index, err)
        })?;
        Attribute::decode(tlv.as_slice()).map_err(|err| {
            ElementError::new(Element::Attribute, index, err)
        })
    }).collect()
}

/// Sorts attributes into DER order.
///
/// The sort is stable, so attributes with identical encodings keep their
/// relative order.
pub fn sort_canonical(attrs: &mut [Attribute]) {
    attrs.sort_by_cached_key(Attribute::to_der)
}

/// Returns the complete encoding of a SET OF Attribute.
///
/// The attributes are encoded in DER order regardless of the order they
/// are given in.
pub fn encode_set(attrs: &[Attribute]) -> Bytes {
    let mut encoded: Vec<_> = attrs.iter().map(Attribute::to_der).collect();
    der::sort_set_of(&mut encoded);
    let res = encode::set(
        der::RawList(&encoded)
    ).to_captured(Mode::Der).into_bytes();
    res
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    const UNKNOWN: ConstOid = Oid(&[43, 6, 1, 4, 1, 9, 9]);

    fn attr(attr_type: ConstOid, value: &[u8]) -> Attribute {
        Attribute::single(attr_type, Bytes::copy_from_slice(value))
    }

    fn display(attr_type: ConstOid, value: &[u8]) -> String {
        attr(attr_type, value).decode_values().remove(0).value
    }

    #[test]
    fn local_key_id() {
        assert_eq!(
            display(
                oid::LOCAL_KEY_ID,
                b"\x04\x10\x01\x02\x03\x04\x05\x06\x07\x08\
                  \x09\x0a\x0b\x0c\x0d\x0e\x0f\x10"
            ),
            "01020304-0506-0708-090a-0b0c0d0e0f10"
        );
        assert_eq!(
            display(oid::LOCAL_KEY_ID, b"\x04\x03\x01\x02\x03"), "010203"
        );
        assert_eq!(format_key_id(b"\xab\xcd"), "abcd");
    }

    #[test]
    fn friendly_name() {
        assert_eq!(
            display(oid::FRIENDLY_NAME, b"\x1e\x04\x00\x41\x00\x42"), "AB"
        );
        assert_eq!(display(oid::FRIENDLY_NAME, b"\x0c\x02AB"), "AB");
    }

    #[test]
    fn text_values() {
        assert_eq!(
            display(oid::ATOM_VIN, b"\x0c\x11XTA21099012345678"),
            "XTA21099012345678"
        );
        assert_eq!(display(oid::ATOM_UID, b"\x13\x03abc"), "abc");
        // Not a string type: the content is used as text.
        assert_eq!(display(oid::ATOM_ROLE_NAME, b"\x04\x03abc"), "abc");
        // Not DER at all: the bytes are used as text.
        assert_eq!(display(oid::ATOM_ROLE_NAME, b"Driver"), "Driver");
    }

    #[test]
    fn version_values() {
        let value = b"\x30\x14\x18\x0f20260115174021Z\x02\x01\x07";
        assert_eq!(
            display(oid::ATOM_VER, value),
            "timestamp=2026-01-15T17:40:21Z, version=7"
        );
        let value = b"\x30\x0e\x18\x09yesterday\x02\x01\x07";
        assert_eq!(
            display(oid::ATOM_VER, value), "timestamp=yesterday, version=7"
        );
        assert_eq!(display(oid::ATOM_VER, b"\x30\x00"), "3000");

        let built = Attribute::version(
            Time::parse_generalized("20260115174021Z").unwrap(), 7
        );
        assert_eq!(
            built.values()[0].as_ref(),
            b"\x30\x14\x18\x0f20260115174021Z\x02\x01\x07".as_ref()
        );
    }

    #[test]
    fn validity_values() {
        let value = b"\x30\x22\x18\x0f20260101000000Z\x18\x0f20270101000000Z";
        assert_eq!(
            display(oid::ATOM_ROLE_VALIDITY_PERIOD, value),
            "notBefore=2026-01-01 00:00:00, notAfter=2027-01-01 00:00:00"
        );
        let value = b"\x30\x26\x18\x1120260101000000.5Z\
                      \x18\x1120270101000000.0Z";
        assert_eq!(
            display(oid::ATOM_ROLE_VALIDITY_PERIOD, value),
            "notBefore=2026-01-01 00:00:00, notAfter=2027-01-01 00:00:00"
        );
        assert_eq!(
            display(oid::ATOM_ROLE_VALIDITY_PERIOD, b"\x30\x03\x02\x01\x01"),
            "3003020101"
        );

        let built = Attribute::validity_period(
            Time::parse_generalized("20260101000000Z").unwrap(),
            Time::parse_generalized("20270101000000Z").unwrap(),
        );
        assert_eq!(
            built.values()[0].as_ref(),
            b"\x30\x22\x18\x0f20260101000000Z\x18\x0f20270101000000Z".as_ref()
        );
    }

    #[test]
    fn standard_values() {
        assert_eq!(
            display(oid::MESSAGE_DIGEST, b"\x04\x02\xab\xcd"), "abcd"
        );
        let data = Attribute::content_type(oid::DATA);
        assert_eq!(data.decode_values()[0].value, "pkcs7-data");
        assert_eq!(data.decode_values()[0].name, "contentType");
        let signed = Attribute::content_type(oid::SIGNED_DATA);
        assert_eq!(signed.decode_values()[0].value, "1.2.840.113549.1.7.2");
        assert_eq!(
            display(oid::SIGNING_TIME, b"\x17\x0d260115174021Z"),
            "2026-01-15T17:40:21Z"
        );
    }

    #[test]
    fn unknown_values() {
        assert_eq!(display(UNKNOWN, b"\x0c\x02hi"), "hi");
        assert_eq!(display(UNKNOWN, b"\x02\x01\x05"), "020105");
        let value = attr(UNKNOWN, b"\x02\x01\x05").decode_values().remove(0);
        assert_eq!(value.name, "1.3.6.1.4.1.9.9");
        assert_eq!(value.raw_hex, "020105");
    }

    #[test]
    fn encode_and_decode() {
        let vin = Attribute::utf8_string(oid::ATOM_VIN, "VIN1");
        assert_eq!(
            vin.to_der().as_ref(),
            b"\x30\x14\x06\x0a\x2b\x06\x01\x04\x01\x86\x8d\x1f\x01\x01\
              \x31\x06\x0c\x04VIN1".as_ref()
        );
        assert_eq!(Attribute::decode(vin.to_der()).unwrap(), vin);
        assert_eq!(vin.text().unwrap(), "VIN1");

        let digest = Attribute::message_digest(b"\x01\x02");
        assert_eq!(digest.values()[0].as_ref(), b"\x04\x02\x01\x02");
    }

    #[test]
    fn decode_either_framing() {
        let attrs = vec![
            Attribute::utf8_string(oid::ATOM_UID, "user-42"),
            Attribute::content_type(oid::DATA),
        ];
        let full = encode_set(&attrs);
        let with_tag: Vec<_> = decode_set(&full).into_iter().map(|item| {
            item.unwrap()
        }).collect();
        let without_tag: Vec<_> = decode_set(
            der::read_single(&full).unwrap().content()
        ).into_iter().map(|item| item.unwrap()).collect();
        assert_eq!(with_tag.len(), 2);
        assert_eq!(with_tag, without_tag);
    }

    #[test]
    fn decode_skips_broken_attribute() {
        let good = Attribute::utf8_string(oid::ATOM_UID, "u").to_der();
        let mut content = good.to_vec();
        content.extend_from_slice(b"\x30\x03\x02\x01\x01"); // no OID
        content.extend_from_slice(&good);
        let res = decode_set(&content);
        assert_eq!(res.len(), 3);
        assert!(res[0].is_ok());
        let err = res[1].as_ref().unwrap_err();
        assert_eq!(err.element(), Element::Attribute);
        assert_eq!(err.index(), 1);
        assert!(res[2].is_ok());
    }

    #[test]
    fn canonical_order() {
        let mut attrs = vec![
            Attribute::utf8_string(oid::ATOM_VIN, "XTA21099012345678"),
            Attribute::message_digest(&[0xAA; 32]),
            Attribute::content_type(oid::DATA),
            Attribute::utf8_string(oid::ATOM_UID, "user-42"),
        ];
        sort_canonical(&mut attrs);
        let encoded: Vec<_> = attrs.iter().map(Attribute::to_der).collect();
        assert!(encoded.windows(2).all(|pair| pair[0] <= pair[1]));

        // Sorting again changes nothing.
        let once = attrs.clone();
        sort_canonical(&mut attrs);
        assert_eq!(attrs, once);

        // The encoded set is in the same order.
        let set = encode_set(&once);
        let mut expected = Vec::new();
        for item in &encoded {
            expected.extend_from_slice(item)
        }
        assert_eq!(der::read_single(&set).unwrap().content(), expected);
    }

    #[test]
    fn values_in_der_order() {
        let attr = Attribute::new(
            Oid(Bytes::from_static(oid::ATOM_UID.0)),
            vec![
                Bytes::from_static(b"\x0c\x02zz"),
                Bytes::from_static(b"\x0c\x01a"),
            ],
        );
        let encoded = attr.to_der();
        let seq = der::read_single(&encoded).unwrap();
        let parts: Vec<_> = der::elements(
            seq.content()
        ).map(Result::unwrap).collect();
        let values: Vec<_> = der::elements(parts[1].content()).map(|item| {
            item.unwrap().as_slice()
        }).collect();
        assert_eq!(values, [&b"\x0c\x01a"[..], &b"\x0c\x02zz"[..]]);

        // The attribute itself keeps the given order.
        assert_eq!(attr.values()[0].as_ref(), b"\x0c\x02zz");
    }

    #[test]
    fn canonical_order_is_stable() {
        let first = Attribute::new(
            Oid(Bytes::from_static(oid::ATOM_UID.0)),
            vec![Bytes::from_static(b"\x0c\x01a")],
        );
        let second = first.clone();
        let other = Attribute::utf8_string(oid::ATOM_UID, "0");
        let mut attrs = vec![first.clone(), other.clone(), second];
        sort_canonical(&mut attrs);
        assert_eq!(attrs[0], other);
        assert_eq!(attrs[1], first);
        assert_eq!(attrs[2], first);
    }
}
