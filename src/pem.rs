//! PEM armor.
//!
//! Both container formats are normally exchanged as DER but are also seen
//! wrapped into PEM blocks. In addition, the encapsulated content of plain
//! CMS signed data may consist of PEM certificates. This module locates the
//! blocks in some text and leaves decoding each block to `pem-rfc7468`.

use std::{error, fmt, str};
use std::borrow::Cow;
use bytes::Bytes;
use pem_rfc7468::LineEnding;


//------------ Block ---------------------------------------------------------

/// A single decoded PEM block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Block {
    /// The label from the begin line, e.g., `CERTIFICATE`.
    label: String,

    /// The decoded body.
    content: Bytes,
}

impl Block {
    /// Decodes a block that spans all of `pem`.
    fn decode(pem: &[u8]) -> Result<Self, PemError> {
        let (label, content) = pem_rfc7468::decode_vec(pem)?;
        Ok(Block { label: label.into(), content: content.into() })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn into_content(self) -> Bytes {
        self.content
    }
}


//------------ Functions -----------------------------------------------------

const BEGIN: &str = "-----BEGIN ";
const END: &str = "-----END ";
const DASHES: &str = "-----";

/// Returns whether the data looks like PEM armor.
///
/// This is true if the data, after skipping leading white space, starts
/// with a begin line.
pub fn is_pem(data: &[u8]) -> bool {
    let start = data.iter().position(|ch| !ch.is_ascii_whitespace());
    match start {
        Some(start) => data[start..].starts_with(BEGIN.as_bytes()),
        None => false,
    }
}

/// Returns an iterator over the PEM blocks in `data`.
///
/// Text outside of blocks is ignored. If the data isn’t valid UTF-8, there
/// are no blocks.
pub fn blocks(data: &[u8]) -> Blocks {
    Blocks { text: str::from_utf8(data).unwrap_or("") }
}

/// Returns the content of the first PEM block in `data`.
pub fn first_block(data: &[u8]) -> Result<Block, PemError> {
    blocks(data).next().unwrap_or(Err(PemError::Missing))
}

/// Returns the DER content of data that may or may not be PEM armored.
///
/// If the data is armored, the content of the first block is returned.
/// Otherwise the data is returned unchanged.
pub fn unwrap_or_der(data: &[u8]) -> Result<Cow<[u8]>, PemError> {
    if is_pem(data) {
        first_block(data).map(|block| {
            Cow::Owned(block.into_content().to_vec())
        })
    }
    else {
        Ok(Cow::Borrowed(data))
    }
}

/// Returns the content of all `CERTIFICATE` blocks in `data`.
///
/// Blocks with a different label or a broken body are skipped.
pub fn certificates(data: &[u8]) -> Vec<Bytes> {
    blocks(data).filter_map(|block| {
        match block {
            Ok(block) if block.label == "CERTIFICATE" => Some(block.content),
            _ => None
        }
    }).collect()
}

/// Encodes data as a PEM block with the given label.
///
/// The body is broken into lines of 64 characters.
pub fn encode(label: &str, data: &[u8]) -> Result<String, PemError> {
    pem_rfc7468::encode_string(label, LineEnding::LF, data).map_err(Into::into)
}


//------------ Blocks --------------------------------------------------------

/// An iterator over the PEM blocks in some text.
#[derive(Clone, Debug)]
pub struct Blocks<'a> {
    text: &'a str,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Result<Block, PemError>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.text.find(BEGIN)?;
        let block = &self.text[start..];
        let end = block.find(END).and_then(|end| {
            let after = end + END.len();
            block[after..].find(DASHES).map(|pos| after + pos + DASHES.len())
        });
        match end {
            Some(end) => {
                self.text = &block[end..];
                Some(Block::decode(block[..end].as_bytes()))
            }
            None => {
                self.text = "";
                Some(Err(PemError::Unterminated))
            }
        }
    }
}


//------------ PemError ------------------------------------------------------

/// PEM armored data could not be decoded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PemError {
    /// There is no PEM block at all.
    Missing,

    /// A block has no end line.
    Unterminated,

    /// The block itself is broken.
    Decode(pem_rfc7468::Error),
}

impl From<pem_rfc7468::Error> for PemError {
    fn from(err: pem_rfc7468::Error) -> Self {
        PemError::Decode(err)
    }
}

impl fmt::Display for PemError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PemError::Missing => f.write_str("no PEM block found"),
            PemError::Unterminated => f.write_str("unterminated PEM block"),
            PemError::Decode(ref err) => {
                write!(f, "invalid PEM block: {}", err)
            }
        }
    }
}

impl error::Error for PemError { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detect_armor() {
        assert!(is_pem(b"\n  -----BEGIN CMS-----\n"));
        assert!(!is_pem(b"\x30\x03\x02\x01\x03"));
        assert!(!is_pem(b""));
    }

    #[test]
    fn encode_and_read() {
        let data: Vec<u8> = (0..100).collect();
        let pem = encode("CERTIFICATE", &data).unwrap();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(pem.ends_with("-----END CERTIFICATE-----\n"));
        assert!(pem.lines().all(|line| line.len() <= 64));

        let block = first_block(pem.as_bytes()).unwrap();
        assert_eq!(block.label(), "CERTIFICATE");
        assert_eq!(block.content().as_ref(), data.as_slice());
        assert_eq!(
            unwrap_or_der(pem.as_bytes()).unwrap().as_ref(), data.as_slice()
        );
        assert_eq!(unwrap_or_der(b"\x30\x00").unwrap().as_ref(), b"\x30\x00");
    }

    #[test]
    fn certificate_blocks() {
        let mut text = String::from("some prose\n");
        text.push_str(&encode("PRIVATE KEY", b"key").unwrap());
        text.push_str(&encode("CERTIFICATE", b"one").unwrap());
        text.push_str("-----BEGIN CERTIFICATE-----\n*!*\n");
        text.push_str("-----END CERTIFICATE-----\n");
        text.push_str(&encode("CERTIFICATE", b"two").unwrap());
        let certs = certificates(text.as_bytes());
        assert_eq!(certs, vec![Bytes::from("one"), Bytes::from("two")]);
    }

    #[test]
    fn broken_armor() {
        assert_eq!(first_block(b"nothing here"), Err(PemError::Missing));
        assert_eq!(
            first_block(b"-----BEGIN CMS-----\nAAAA\n"),
            Err(PemError::Unterminated)
        );
        assert!(matches!(
            first_block(b"-----BEGIN CMS-----\n*\n-----END CMS-----\n"),
            Err(PemError::Decode(_))
        ));
        assert!(matches!(
            first_block(b"-----BEGIN CMS-----\nAAAA\n-----END KEY-----\n"),
            Err(PemError::Decode(_))
        ));
    }

    #[test]
    fn fixture() {
        let pem = include_bytes!("../test-data/role.pem");
        let der = include_bytes!("../test-data/role.der");
        assert!(is_pem(pem));
        assert_eq!(certificates(pem), vec![Bytes::from_static(der)]);
    }
}
