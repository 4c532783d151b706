//! ATOM PKCS #12 registries.
//!
//! A registry is a PKCS #12 PFX whose authenticated safe is CMS signed data
//! instead of plain data. The signed data encapsulates a `SafeContents`
//! sequence of cert bags, one for each role certificate. The signer
//! attributes carry the vehicle identifier, the registry version, and the
//! user identifier while each bag carries the role name and the role
//! validity period as bag attributes.
//!
//! Registries are decoded into a [`Container`]. New registries are created
//! with [`build_registry`].

pub use self::builder::{build_registry, SafeBagInput, SignerAttrs};
pub use self::container::Container;
pub use self::pfx::{MacData, Pfx};
pub use self::safebag::{CertBag, SafeBag, SafeBagInfo};

pub mod builder;
pub mod container;
pub mod pfx;
pub mod safebag;
