//! Reading and building CMS signed data and ATOM role registries.
//!
//! This crate decodes two related container formats built on ASN.1 DER.
//! The first is a plain CMS (PKCS #7) _SignedData_ envelope as defined in
//! [RFC 5652]. The second is the _ATOM PKCS #12 registry,_ a PKCS #12 PFX
//! whose authenticated safe is a complete _SignedData_ carrying a list of
//! role certificates as safe bags plus a number of vendor-defined signed
//! attributes: a vehicle identifier, a version with a timestamp, a user
//! identifier, and per-certificate role names and role validity periods.
//!
//! Producers of these containers disagree about whether context-tagged
//! fields are tagged implicitly or explicitly. The parsers in this crate
//! therefore never trust the outer tag alone and recover the framing of
//! each ambiguous field via [`der::recover_tlv`] and
//! [`der::unwrap_primitive`]. Parsing is best-effort: a single broken
//! certificate, safe bag, or attribute is skipped and reported rather than
//! failing the whole container.
//!
//! The [`registry::builder`] module runs the pipeline in reverse and
//! produces byte-exact DER for a fresh registry.
//!
//! The crate does not verify signatures.
//!
//! [RFC 5652]: https://tools.ietf.org/html/rfc5652

//--- Re-exports
//
pub use self::cms::CmsContainer;
pub use self::error::{BuildError, ElementError, ParseError};
pub use self::registry::Container;


//--- Modules
//
pub mod attr;
pub mod cms;
pub mod crypto;
pub mod der;
pub mod error;
pub mod oid;
pub mod pem;
pub mod registry;
pub mod resolve;
pub mod x509;

mod util;
