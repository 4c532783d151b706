//! Low-level DER primitives.
//!
//! Most of the decoding in this crate is done through [bcder]. However, the
//! containers we deal with are produced by a variety of encoders that
//! disagree on whether context-tagged fields are tagged implicitly or
//! explicitly. A generic decoder will happily hand us either the complete
//! encoding of a value or only its content, depending on the producer. This
//! module provides the byte-level tools to find out which of the two we got
//! and to restore the missing framing.
//!
//! The central decision rule lives in [`recover_tlv`]: if the data starts
//! with the expected universal tag and a single value with that tag spans
//! all of the data, it already is a complete encoding. Otherwise only the
//! content was stored and we synthesize tag and length. [`unwrap_primitive`]
//! is the inverse operation used for OCTET STRING payloads.
//!
//! Only the low tag number form is supported when creating values. Reading
//! understands the high tag number form, too.
//!
//! [bcder]: https://docs.rs/bcder/

use std::{error, fmt, io, mem};
use std::borrow::Cow;
use bcder::{Mode, Tag};
use bcder::decode::{self, Content, ContentError, DecodeError};
use bcder::encode;
use bytes::Bytes;


//------------ Identifier Octets ---------------------------------------------

pub const INTEGER: u8 = 0x02;
pub const BIT_STRING: u8 = 0x03;
pub const OCTET_STRING: u8 = 0x04;
pub const NULL: u8 = 0x05;
pub const OID: u8 = 0x06;
pub const UTF8_STRING: u8 = 0x0C;
pub const NUMERIC_STRING: u8 = 0x12;
pub const PRINTABLE_STRING: u8 = 0x13;
pub const TELETEX_STRING: u8 = 0x14;
pub const IA5_STRING: u8 = 0x16;
pub const UTC_TIME: u8 = 0x17;
pub const GENERALIZED_TIME: u8 = 0x18;
pub const VISIBLE_STRING: u8 = 0x1A;
pub const UNIVERSAL_STRING: u8 = 0x1C;
pub const BMP_STRING: u8 = 0x1E;
pub const SEQUENCE: u8 = 0x30;
pub const SET: u8 = 0x31;

/// Context tag 0, primitive.
pub const CTX_0: u8 = 0x80;

/// Context tag 0, constructed.
pub const CTX_CONS_0: u8 = 0xA0;

/// Context tag 1, constructed.
pub const CTX_CONS_1: u8 = 0xA1;


//------------ Class ---------------------------------------------------------

/// The class of a tag.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Class {
    Universal,
    Application,
    Context,
    Private,
}

impl Class {
    /// Returns the class encoded in the first identifier octet.
    pub fn from_identifier(identifier: u8) -> Self {
        match identifier >> 6 {
            0 => Class::Universal,
            1 => Class::Application,
            2 => Class::Context,
            _ => Class::Private,
        }
    }

    /// Returns the identifier octet for a tag of this class.
    ///
    /// The tag number must be below 31.
    pub fn identifier(self, constructed: bool, number: u8) -> u8 {
        let class = match self {
            Class::Universal => 0x00,
            Class::Application => 0x40,
            Class::Context => 0x80,
            Class::Private => 0xC0,
        };
        class | if constructed { 0x20 } else { 0 } | (number & 0x1F)
    }
}


//------------ Tlv -----------------------------------------------------------

/// A single encoded value found in a slice of DER data.
#[derive(Clone, Copy, Debug)]
pub struct Tlv<'a> {
    /// The first identifier octet.
    identifier: u8,

    /// The tag number.
    number: u32,

    /// The complete encoding of the value.
    raw: &'a [u8],

    /// The length of identifier and length octets.
    header_len: usize,
}

impl<'a> Tlv<'a> {
    /// Returns the first identifier octet.
    ///
    /// For tag numbers below 31, this octet fully describes the tag.
    pub fn identifier(&self) -> u8 {
        self.identifier
    }

    /// Returns the tag number.
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn class(&self) -> Class {
        Class::from_identifier(self.identifier)
    }

    pub fn is_constructed(&self) -> bool {
        self.identifier & 0x20 != 0
    }

    /// Returns the length of the content.
    pub fn len(&self) -> usize {
        self.raw.len() - self.header_len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the content octets.
    pub fn content(&self) -> &'a [u8] {
        &self.raw[self.header_len..]
    }

    /// Returns the complete encoding including tag and length.
    pub fn as_slice(&self) -> &'a [u8] {
        self.raw
    }
}


//------------ Reading -------------------------------------------------------

/// Reads a single value from the beginning of `data`.
///
/// Returns the value and the remaining data. Indefinite length values are
/// not allowed in DER and are rejected.
pub fn read_tlv(data: &[u8]) -> Result<(Tlv, &[u8]), TlvError> {
    let identifier = match data.first() {
        Some(identifier) => *identifier,
        None => return Err(TlvError::TruncatedHeader),
    };
    let mut pos = 1;
    let mut number = u32::from(identifier & 0x1F);
    if number == 0x1F {
        number = 0;
        loop {
            let octet = *data.get(pos).ok_or(TlvError::TruncatedHeader)?;
            pos += 1;
            if number > (u32::MAX >> 7) {
                return Err(TlvError::Oversized)
            }
            number = (number << 7) | u32::from(octet & 0x7F);
            if octet & 0x80 == 0 {
                break
            }
        }
    }
    let first = *data.get(pos).ok_or(TlvError::TruncatedLength)?;
    pos += 1;
    let len = if first < 0x80 {
        usize::from(first)
    }
    else if first == 0x80 {
        return Err(TlvError::IndefiniteLength)
    }
    else {
        let count = usize::from(first & 0x7F);
        if count > mem::size_of::<usize>() {
            return Err(TlvError::Oversized)
        }
        let octets = data.get(pos..pos + count).ok_or(
            TlvError::TruncatedLength
        )?;
        pos += count;
        octets.iter().fold(0usize, |len, octet| {
            (len << 8) | usize::from(*octet)
        })
    };
    let end = pos.checked_add(len).ok_or(TlvError::Oversized)?;
    if end > data.len() {
        return Err(TlvError::TruncatedContent)
    }
    let (raw, rest) = data.split_at(end);
    Ok((Tlv { identifier, number, raw, header_len: pos }, rest))
}

/// Reads a value that must span all of `data`.
pub fn read_single(data: &[u8]) -> Result<Tlv, TlvError> {
    let (tlv, rest) = read_tlv(data)?;
    if !rest.is_empty() {
        return Err(TlvError::TrailingData)
    }
    Ok(tlv)
}

/// Returns an iterator over the values contained in `data`.
pub fn elements(data: &[u8]) -> Elements {
    Elements { data, failed: false }
}


//------------ Elements ------------------------------------------------------

/// An iterator over consecutive values.
///
/// If a value cannot be read, the iterator returns the error once and then
/// stops since there is no way to find the start of the next value.
#[derive(Clone, Debug)]
pub struct Elements<'a> {
    data: &'a [u8],
    failed: bool,
}

impl<'a> Iterator for Elements<'a> {
    type Item = Result<Tlv<'a>, TlvError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.data.is_empty() {
            return None
        }
        match read_tlv(self.data) {
            Ok((tlv, rest)) => {
                self.data = rest;
                Some(Ok(tlv))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}


//------------ Writing -------------------------------------------------------

/// Appends the minimal DER encoding of a length to `target`.
///
/// Lengths below 128 are a single octet. Longer lengths are `0x80` plus the
/// number of octets followed by the big-endian length without leading
/// zeros.
pub fn write_length(target: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        target.push(len as u8);
    }
    else {
        let octets = len.to_be_bytes();
        let skip = octets.iter().take_while(|&&x| x == 0).count();
        target.push(0x80 | (octets.len() - skip) as u8);
        target.extend_from_slice(&octets[skip..]);
    }
}

/// Returns the number of octets [`write_length`] will produce.
pub fn length_len(len: usize) -> usize {
    if len < 0x80 {
        1
    }
    else {
        let octets = len.to_be_bytes();
        1 + octets.len() - octets.iter().take_while(|&&x| x == 0).count()
    }
}

/// Creates a complete value from an identifier octet and its content.
///
/// The identifier octet carries class, constructed bit, and tag number. Use
/// [`Class::identifier`] to create one.
pub fn wrap_tag(identifier: u8, content: &[u8]) -> Vec<u8> {
    let mut res = Vec::with_capacity(
        1 + length_len(content.len()) + content.len()
    );
    res.push(identifier);
    write_length(&mut res, content.len());
    res.extend_from_slice(content);
    res
}

/// Encodes a signed integer as a complete INTEGER value.
pub fn encode_integer(value: i64) -> Vec<u8> {
    let octets = value.to_be_bytes();
    let mut start = 0;
    while start < octets.len() - 1 {
        let redundant = (octets[start] == 0 && octets[start + 1] & 0x80 == 0)
            || (octets[start] == 0xFF && octets[start + 1] & 0x80 != 0);
        if !redundant {
            break
        }
        start += 1;
    }
    wrap_tag(INTEGER, &octets[start..])
}


//------------ Ambiguous Framing ---------------------------------------------

/// Strips a single wrapper with the given tag if present.
///
/// If `data` is one complete value with the identifier octet `tag`, returns
/// its content. Otherwise the wrapper is considered absent and `data` is
/// returned unchanged.
pub fn unwrap_primitive(data: &[u8], tag: u8) -> &[u8] {
    match read_single(data) {
        Ok(tlv) if tlv.identifier() == tag => tlv.content(),
        _ => data
    }
}

/// Restores the complete encoding of a value that may have lost its tag.
///
/// If `data` starts with `tag` and a single value spans all of it, the data
/// already is a complete encoding and is returned as is. Otherwise, `data`
/// is taken to be the content only and tag and length are added.
pub fn recover_tlv(data: &[u8], tag: u8) -> Cow<[u8]> {
    if data.first() == Some(&tag) && read_single(data).is_ok() {
        Cow::Borrowed(data)
    }
    else {
        Cow::Owned(wrap_tag(tag, data))
    }
}

/// Strips a single wrapper from owned data.
///
/// This is [`unwrap_primitive`] for `Bytes`. The result shares the
/// underlying buffer.
pub fn unwrap_primitive_bytes(data: &Bytes, tag: u8) -> Bytes {
    data.slice_ref(unwrap_primitive(data.as_ref(), tag))
}

/// Restores the complete encoding of owned data.
///
/// This is [`recover_tlv`] for `Bytes`. If the data already is a complete
/// value, it is returned as is without copying.
pub fn recover_tlv_bytes(data: Bytes, tag: u8) -> Bytes {
    let wrapped = match recover_tlv(data.as_ref(), tag) {
        Cow::Owned(wrapped) => Some(wrapped),
        Cow::Borrowed(_) => None,
    };
    match wrapped {
        Some(wrapped) => wrapped.into(),
        None => data,
    }
}

/// Takes the content of a value regardless of its encoding form.
///
/// Context-tagged fields may be primitive when tagged implicitly and
/// constructed when tagged explicitly. This returns the content octets in
/// either case so that the framing can be sorted out later.
pub fn take_content<S: decode::Source>(
    content: &mut Content<S>
) -> Result<Bytes, DecodeError<S::Error>> {
    match *content {
        Content::Primitive(ref mut prim) => prim.take_all(),
        Content::Constructed(ref mut cons) => {
            cons.capture_all().map(|captured| captured.into_bytes())
        }
    }
}

/// Takes a version INTEGER.
///
/// Returns `None` if the value doesn’t fit into an `i64`. Callers decide
/// which versions they support.
pub fn take_version<S: decode::Source>(
    cons: &mut decode::Constructed<S>
) -> Result<Option<i64>, DecodeError<S::Error>> {
    cons.take_primitive_if(Tag::INTEGER, |prim| {
        let content = prim.take_all()?;
        if content.is_empty() {
            return Err(prim.content_err("invalid integer"))
        }
        Ok(decode_integer(&content))
    })
}


//------------ Strings and Integers ------------------------------------------

/// Decodes a character string value.
///
/// Returns `None` if the value isn’t one of the ASN.1 string types or if
/// its content isn’t valid for the type.
pub fn decode_string(tlv: &Tlv) -> Option<String> {
    let content = tlv.content();
    match tlv.identifier() {
        UTF8_STRING | PRINTABLE_STRING | IA5_STRING | VISIBLE_STRING
        | NUMERIC_STRING => {
            String::from_utf8(content.into()).ok()
        }
        TELETEX_STRING => {
            Some(content.iter().map(|&ch| char::from(ch)).collect())
        }
        BMP_STRING => Some(decode_bmp(content)),
        UNIVERSAL_STRING => {
            if content.len() % 4 != 0 {
                return None
            }
            content.chunks_exact(4).map(|chunk| {
                char::from_u32(u32::from_be_bytes(
                    [chunk[0], chunk[1], chunk[2], chunk[3]]
                ))
            }).collect()
        }
        _ => None
    }
}

/// Decodes the content of a BMPString.
///
/// The content is UCS-2 in big-endian byte order. Unpaired surrogates are
/// replaced and a trailing odd octet is ignored.
pub fn decode_bmp(content: &[u8]) -> String {
    char::decode_utf16(
        content.chunks_exact(2).map(|x| u16::from_be_bytes([x[0], x[1]]))
    ).map(|ch| ch.unwrap_or(char::REPLACEMENT_CHARACTER)).collect()
}

/// Decodes the content of an INTEGER that fits into an `i64`.
pub fn decode_integer(content: &[u8]) -> Option<i64> {
    if content.is_empty() || content.len() > 8 {
        return None
    }
    let fill = if content[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut octets = [fill; 8];
    octets[8 - content.len()..].copy_from_slice(content);
    Some(i64::from_be_bytes(octets))
}


//------------ Canonical SET OF ----------------------------------------------

/// Sorts the encoded elements of a SET OF into DER order.
///
/// Elements are ordered ascending by their encodings compared octet by
/// octet. Equal encodings keep their relative order.
pub fn sort_set_of<T: AsRef<[u8]>>(elements: &mut [T]) {
    elements.sort_by(|left, right| left.as_ref().cmp(right.as_ref()))
}


//------------ Raw and RawList -----------------------------------------------

/// Already encoded data to be included verbatim in encoder output.
#[derive(Clone, Copy, Debug)]
pub struct Raw<'a>(pub &'a [u8]);

impl encode::Values for Raw<'_> {
    fn encoded_len(&self, _: Mode) -> usize {
        self.0.len()
    }

    fn write_encoded<W: io::Write>(
        &self, _: Mode, target: &mut W
    ) -> Result<(), io::Error> {
        target.write_all(self.0)
    }
}

/// A list of already encoded values included one after another.
#[derive(Clone, Copy, Debug)]
pub struct RawList<'a, T>(pub &'a [T]);

impl<T: AsRef<[u8]>> encode::Values for RawList<'_, T> {
    fn encoded_len(&self, _: Mode) -> usize {
        self.0.iter().map(|item| item.as_ref().len()).sum()
    }

    fn write_encoded<W: io::Write>(
        &self, _: Mode, target: &mut W
    ) -> Result<(), io::Error> {
        for item in self.0 {
            target.write_all(item.as_ref())?
        }
        Ok(())
    }
}


//------------ TlvError ------------------------------------------------------

/// A value could not be read from DER data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TlvError {
    /// The data ended inside the identifier octets.
    TruncatedHeader,

    /// The data ended inside the length octets.
    TruncatedLength,

    /// There is less content than the length promises.
    TruncatedContent,

    /// The indefinite length form was used.
    IndefiniteLength,

    /// Tag number or length exceed what we can represent.
    Oversized,

    /// There is more data after the value.
    TrailingData,
}

impl fmt::Display for TlvError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            TlvError::TruncatedHeader => "truncated tag",
            TlvError::TruncatedLength => "truncated length",
            TlvError::TruncatedContent => "truncated content",
            TlvError::IndefiniteLength => "indefinite length",
            TlvError::Oversized => "oversized tag or length",
            TlvError::TrailingData => "trailing data",
        })
    }
}

impl error::Error for TlvError { }

impl From<TlvError> for ContentError {
    fn from(err: TlvError) -> Self {
        ContentError::from_boxed(Box::new(err))
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    fn length(len: usize) -> Vec<u8> {
        let mut res = Vec::new();
        write_length(&mut res, len);
        assert_eq!(res.len(), length_len(len));
        res
    }

    #[test]
    fn minimal_lengths() {
        assert_eq!(length(0), b"\x00");
        assert_eq!(length(127), b"\x7f");
        assert_eq!(length(128), b"\x81\x80");
        assert_eq!(length(255), b"\x81\xff");
        assert_eq!(length(256), b"\x82\x01\x00");
        assert_eq!(length(65535), b"\x82\xff\xff");
        assert_eq!(length(65536), b"\x83\x01\x00\x00");
    }

    #[test]
    fn read_values() {
        let data = b"\x30\x03\x02\x01\x05\x04\x00";
        let (tlv, rest) = read_tlv(data).unwrap();
        assert_eq!(tlv.identifier(), SEQUENCE);
        assert_eq!(tlv.number(), 16);
        assert_eq!(tlv.class(), Class::Universal);
        assert!(tlv.is_constructed());
        assert_eq!(tlv.len(), 3);
        assert_eq!(tlv.content(), b"\x02\x01\x05");
        assert_eq!(tlv.as_slice(), &data[..5]);
        assert_eq!(rest, b"\x04\x00");

        let (tlv, rest) = read_tlv(rest).unwrap();
        assert_eq!(tlv.identifier(), OCTET_STRING);
        assert!(tlv.is_empty());
        assert!(rest.is_empty());

        let (tlv, _) = read_tlv(b"\xa0\x81\x01\x00").unwrap();
        assert_eq!(tlv.class(), Class::Context);
        assert_eq!(tlv.number(), 0);
        assert_eq!(tlv.content(), b"\x00");

        let (tlv, _) = read_tlv(b"\x9f\x81\x00\x00").unwrap();
        assert_eq!(tlv.number(), 128);
    }

    #[test]
    fn read_truncated() {
        assert_eq!(read_tlv(b"").unwrap_err(), TlvError::TruncatedHeader);
        assert_eq!(read_tlv(b"\x1f\x81").unwrap_err(), TlvError::TruncatedHeader);
        assert_eq!(read_tlv(b"\x30").unwrap_err(), TlvError::TruncatedLength);
        assert_eq!(
            read_tlv(b"\x30\x82\x01").unwrap_err(), TlvError::TruncatedLength
        );
        assert_eq!(
            read_tlv(b"\x04\x05abc").unwrap_err(), TlvError::TruncatedContent
        );
        assert_eq!(
            read_tlv(b"\x30\x80\x00\x00").unwrap_err(),
            TlvError::IndefiniteLength
        );
        assert_eq!(
            read_single(b"\x05\x00\x05\x00").unwrap_err(),
            TlvError::TrailingData
        );
    }

    #[test]
    fn elements_stop_on_error() {
        let mut iter = elements(b"\x05\x00\x04\x01a\x04\x09abc");
        assert_eq!(iter.next().unwrap().unwrap().identifier(), NULL);
        assert_eq!(iter.next().unwrap().unwrap().content(), b"a");
        assert_eq!(
            iter.next().unwrap().unwrap_err(), TlvError::TruncatedContent
        );
        assert!(iter.next().is_none());
    }

    #[test]
    fn wrap() {
        assert_eq!(wrap_tag(OCTET_STRING, b"ab"), b"\x04\x02ab");
        assert_eq!(
            Class::Context.identifier(true, 0), CTX_CONS_0
        );
        assert_eq!(Class::Context.identifier(false, 0), CTX_0);
        let long = vec![0u8; 300];
        let wrapped = wrap_tag(SET, &long);
        assert_eq!(&wrapped[..4], b"\x31\x82\x01\x2c");
        assert_eq!(wrapped.len(), 304);
    }

    #[test]
    fn integers() {
        assert_eq!(encode_integer(0), b"\x02\x01\x00");
        assert_eq!(encode_integer(7), b"\x02\x01\x07");
        assert_eq!(encode_integer(128), b"\x02\x02\x00\x80");
        assert_eq!(encode_integer(256), b"\x02\x02\x01\x00");
        assert_eq!(encode_integer(-1), b"\x02\x01\xff");
        assert_eq!(encode_integer(-129), b"\x02\x02\xff\x7f");
        assert_eq!(decode_integer(b"\x00\x80"), Some(128));
        assert_eq!(decode_integer(b"\xff\x7f"), Some(-129));
        assert_eq!(decode_integer(b""), None);
        assert_eq!(decode_integer(&[1; 9]), None);
    }

    #[test]
    fn unwrap_either_shape() {
        assert_eq!(unwrap_primitive(b"\x04\x03abc", OCTET_STRING), b"abc");
        assert_eq!(unwrap_primitive(b"abc", OCTET_STRING), b"abc");

        // Wrong tag or not spanning everything leaves the data alone.
        assert_eq!(
            unwrap_primitive(b"\x30\x01\x00", OCTET_STRING), b"\x30\x01\x00"
        );
        assert_eq!(
            unwrap_primitive(b"\x04\x01a\x05\x00", OCTET_STRING),
            b"\x04\x01a\x05\x00"
        );
    }

    #[test]
    fn recover_either_shape() {
        let full = b"\x31\x06\x04\x01a\x04\x01b";
        assert!(matches!(recover_tlv(full, SET), Cow::Borrowed(_)));
        assert_eq!(recover_tlv(full, SET).as_ref(), full);
        assert_eq!(recover_tlv(&full[2..], SET).as_ref(), full);

        // A single element that happens to be a complete value still gets
        // wrapped if its tag isn’t the expected one.
        assert_eq!(
            recover_tlv(b"\x30\x00", SET).as_ref(), b"\x31\x02\x30\x00"
        );

        // Same tag but not spanning the whole data means content only.
        assert_eq!(
            recover_tlv(b"\x30\x00\x30\x00", SEQUENCE).as_ref(),
            b"\x30\x04\x30\x00\x30\x00"
        );
    }

    #[test]
    fn owned_shapes() {
        let full = Bytes::from_static(b"\x04\x03abc");
        assert_eq!(unwrap_primitive_bytes(&full, OCTET_STRING), "abc");
        let bare = Bytes::from_static(b"abc");
        assert_eq!(unwrap_primitive_bytes(&bare, OCTET_STRING), "abc");
        assert_eq!(recover_tlv_bytes(full.clone(), OCTET_STRING), full);
        assert_eq!(recover_tlv_bytes(bare, OCTET_STRING), full);
    }

    #[test]
    fn strings() {
        let bmp = read_single(b"\x1e\x04\x00\x41\x00\x42").unwrap();
        assert_eq!(decode_string(&bmp).unwrap(), "AB");
        assert_eq!(decode_bmp(b"\x00\x41\x00\x42"), "AB");
        assert_eq!(decode_bmp(b"\x04\x1f\x00"), "\u{41f}");

        let utf8 = read_single(b"\x0c\x03abc").unwrap();
        assert_eq!(decode_string(&utf8).unwrap(), "abc");
        let printable = read_single(b"\x13\x02DE").unwrap();
        assert_eq!(decode_string(&printable).unwrap(), "DE");
        let octets = read_single(b"\x04\x02DE").unwrap();
        assert_eq!(decode_string(&octets), None);
        let bad = read_single(b"\x0c\x01\xff").unwrap();
        assert_eq!(decode_string(&bad), None);
    }

    #[test]
    fn set_of_order() {
        let mut set: Vec<&[u8]> = vec![
            b"\x31\x01\x02", b"\x04\x01\x01", b"\x04\x00", b"\x04\x01\x01",
        ];
        sort_set_of(&mut set);
        let expected: Vec<&[u8]> = vec![
            b"\x04\x00", b"\x04\x01\x01", b"\x04\x01\x01", b"\x31\x01\x02",
        ];
        assert_eq!(set, expected);
    }
}
