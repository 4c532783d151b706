//! Error handling.
//!
//! Errors fall into three groups. A [`ParseError`] aborts parsing of a
//! container. An [`ElementError`] describes a single certificate, safe bag,
//! or attribute that had to be skipped while the rest of the container was
//! still parsed. A [`BuildError`] aborts building a registry before any
//! output is produced.

use std::{error, fmt};
use std::convert::Infallible;
use bcder::Oid;
use bcder::decode::DecodeError;
use bytes::Bytes;
use crate::der::TlvError;
use crate::pem::PemError;
use crate::x509::Time;


//------------ ParseError ----------------------------------------------------

/// Parsing a container failed.
#[derive(Debug)]
pub struct ParseError {
    kind: ParseErrorKind,
}

#[derive(Debug)]
enum ParseErrorKind {
    /// The encoding of a mandatory part is broken.
    Malformed {
        stage: &'static str,
        cause: MalformedCause,
    },

    /// The PFX has a version other than 3.
    ///
    /// The version is `None` if it doesn’t fit into an `i64`.
    UnsupportedVersion(Option<i64>),

    /// The authenticated safe of a registry isn’t signed data.
    UnexpectedContentType(Oid<Bytes>),

    /// A CMS content info doesn’t contain signed data.
    UnsupportedContentType(Oid<Bytes>),
}

#[derive(Debug)]
enum MalformedCause {
    Decode(DecodeError<Infallible>),
    Tlv(TlvError),
    Pem(PemError),
}

impl ParseError {
    pub(crate) fn malformed(
        stage: &'static str, err: DecodeError<Infallible>
    ) -> Self {
        ParseError {
            kind: ParseErrorKind::Malformed {
                stage, cause: MalformedCause::Decode(err)
            }
        }
    }

    pub(crate) fn malformed_tlv(stage: &'static str, err: TlvError) -> Self {
        ParseError {
            kind: ParseErrorKind::Malformed {
                stage, cause: MalformedCause::Tlv(err)
            }
        }
    }

    pub(crate) fn malformed_pem(err: PemError) -> Self {
        ParseError {
            kind: ParseErrorKind::Malformed {
                stage: "pem", cause: MalformedCause::Pem(err)
            }
        }
    }

    pub(crate) fn unsupported_version(version: Option<i64>) -> Self {
        ParseError { kind: ParseErrorKind::UnsupportedVersion(version) }
    }

    pub(crate) fn unexpected_content_type(oid: Oid<Bytes>) -> Self {
        ParseError { kind: ParseErrorKind::UnexpectedContentType(oid) }
    }

    pub(crate) fn unsupported_content_type(oid: Oid<Bytes>) -> Self {
        ParseError { kind: ParseErrorKind::UnsupportedContentType(oid) }
    }

    /// Returns the name of the stage where a malformed encoding was found.
    pub fn stage(&self) -> Option<&'static str> {
        match self.kind {
            ParseErrorKind::Malformed { stage, .. } => Some(stage),
            _ => None
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self.kind, ParseErrorKind::Malformed { .. })
    }

    pub fn is_unsupported_version(&self) -> bool {
        matches!(self.kind, ParseErrorKind::UnsupportedVersion(_))
    }

    pub fn is_unexpected_content_type(&self) -> bool {
        matches!(self.kind, ParseErrorKind::UnexpectedContentType(_))
    }

    pub fn is_unsupported_content_type(&self) -> bool {
        matches!(self.kind, ParseErrorKind::UnsupportedContentType(_))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ParseErrorKind::Malformed { stage, ref cause } => {
                write!(f, "malformed encoding in {}: ", stage)?;
                match *cause {
                    MalformedCause::Decode(ref err) => err.fmt(f),
                    MalformedCause::Tlv(ref err) => err.fmt(f),
                    MalformedCause::Pem(ref err) => err.fmt(f),
                }
            }
            ParseErrorKind::UnsupportedVersion(Some(version)) => {
                write!(f, "unsupported PFX version {}", version)
            }
            ParseErrorKind::UnsupportedVersion(None) => {
                f.write_str("unsupported PFX version out of range")
            }
            ParseErrorKind::UnexpectedContentType(ref oid) => {
                write!(f, "unexpected authSafe content type {}", oid)
            }
            ParseErrorKind::UnsupportedContentType(ref oid) => {
                write!(f, "unsupported content type {}", oid)
            }
        }
    }
}

impl error::Error for ParseError { }


//------------ ElementError --------------------------------------------------

/// A single element of a container was skipped.
///
/// These are collected while parsing and are available from the container.
/// They are not errors of the container itself.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementError {
    element: Element,
    index: usize,
    reason: String,
}

/// The kind of element that was skipped.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Element {
    Certificate,
    SafeBag,
    Attribute,
}

impl ElementError {
    pub(crate) fn new(
        element: Element, index: usize, reason: impl fmt::Display
    ) -> Self {
        let res = ElementError { element, index, reason: reason.to_string() };
        log::debug!("{}", res);
        res
    }

    /// Returns the kind of element that was skipped.
    pub fn element(&self) -> Element {
        self.element
    }

    /// Returns the position of the element in its list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Element::Certificate => "certificate",
            Element::SafeBag => "safe bag",
            Element::Attribute => "attribute",
        })
    }
}

impl fmt::Display for ElementError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "skipped {} {}: {}", self.element, self.index, self.reason)
    }
}

impl error::Error for ElementError { }


//------------ BuildError ----------------------------------------------------

/// Building a registry failed.
#[derive(Debug)]
pub struct BuildError {
    kind: BuildErrorKind,
}

#[derive(Debug)]
enum BuildErrorKind {
    /// The signer certificate has no subject key identifier.
    MissingSubjectKeyIdentifier,

    /// The signer doesn’t have the key to sign with.
    MissingSignerKeyMaterial,

    /// A time can’t be encoded as a GeneralizedTime.
    TimeOutOfRange(Time),

    /// Creating the signature failed.
    Signing(String),
}

impl BuildError {
    pub(crate) fn missing_subject_key_identifier() -> Self {
        BuildError { kind: BuildErrorKind::MissingSubjectKeyIdentifier }
    }

    pub(crate) fn missing_signer_key_material() -> Self {
        BuildError { kind: BuildErrorKind::MissingSignerKeyMaterial }
    }

    pub(crate) fn time_out_of_range(time: Time) -> Self {
        BuildError { kind: BuildErrorKind::TimeOutOfRange(time) }
    }

    pub(crate) fn signing(err: impl fmt::Display) -> Self {
        BuildError { kind: BuildErrorKind::Signing(err.to_string()) }
    }

    pub fn is_missing_subject_key_identifier(&self) -> bool {
        matches!(self.kind, BuildErrorKind::MissingSubjectKeyIdentifier)
    }

    pub fn is_missing_signer_key_material(&self) -> bool {
        matches!(self.kind, BuildErrorKind::MissingSignerKeyMaterial)
    }

    pub fn is_time_out_of_range(&self) -> bool {
        matches!(self.kind, BuildErrorKind::TimeOutOfRange(_))
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            BuildErrorKind::MissingSubjectKeyIdentifier => {
                f.write_str(
                    "signer certificate has no subject key identifier"
                )
            }
            BuildErrorKind::MissingSignerKeyMaterial => {
                f.write_str("signer key material missing")
            }
            BuildErrorKind::TimeOutOfRange(time) => {
                write!(
                    f, "time {} can’t be encoded as GeneralizedTime",
                    time.to_rfc3339()
                )
            }
            BuildErrorKind::Signing(ref err) => {
                write!(f, "signing failed: {}", err)
            }
        }
    }
}

impl error::Error for BuildError { }


//============ Tests =========================================================
