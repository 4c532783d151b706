//! Cryptographic Message Syntax.
//!
//! This module contains the generic CMS signed data model in
//! [`signed_data`] and the container for plain CMS objects in
//! [`container`]. The registry format in [`crate::registry`] nests the same
//! signed data into a PKCS #12 shell.

pub use self::container::{CmsContainer, SignerSummary};
pub use self::signed_data::{
    AlgorithmIdentifier, ContentInfo, EncapsulatedContentInfo, SignedData,
    SignerIdentifier, SignerInfo,
};

pub mod container;
pub mod signed_data;
