//! A signer with software keys.
//!
//! This signer keeps ECDSA P-256 keys in memory and signs via ring. It is
//! what you want when the registry signing key is available as a PKCS #8
//! file.

use std::io;
use std::sync::{Arc, PoisonError, RwLock};
use bytes::Bytes;
use ring::rand;
use ring::signature::{
    EcdsaKeyPair, KeyPair as _, ECDSA_P256_SHA256_ASN1_SIGNING,
};
use crate::pem;
use super::signer::{KeyError, PublicKey, Signer, SigningError};
use super::signature::{Signature, SignatureAlgorithm};


//------------ EcdsaSigner ---------------------------------------------------

/// A ring based signer.
///
/// Keeps the keys in memory.
pub struct EcdsaSigner {
    keys: RwLock<Vec<Option<Arc<KeyPair>>>>,
    rng: rand::SystemRandom,
}

impl EcdsaSigner {
    pub fn new() -> EcdsaSigner {
        EcdsaSigner {
            keys: Default::default(),
            rng: rand::SystemRandom::new(),
        }
    }

    /// Imports a key from its PKCS #8 DER encoding.
    pub fn key_from_der(&self, der: &[u8]) -> Result<KeyId, io::Error> {
        let key = KeyPair::from_pkcs8(der, &self.rng)?;
        Ok(self.insert_key(key))
    }

    /// Imports a key from a PEM armored PKCS #8 encoding.
    pub fn key_from_pem(&self, pem: &[u8]) -> Result<KeyId, io::Error> {
        let block = pem::first_block(pem).map_err(|err| {
            io::Error::new(io::ErrorKind::InvalidData, err)
        })?;
        self.key_from_der(block.content())
    }

    fn insert_key(&self, key: KeyPair) -> KeyId {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        let res = keys.len();
        keys.push(Some(key.into()));
        KeyId(res)
    }

    fn get_key(&self, id: KeyId) -> Result<Arc<KeyPair>, KeyError<io::Error>> {
        self.keys.read().unwrap_or_else(
            PoisonError::into_inner
        ).get(id.0).and_then(|key| {
            key.as_ref().cloned()
        }).ok_or(KeyError::KeyNotFound)
    }

    fn delete_key(&self, key: KeyId) -> Result<(), KeyError<io::Error>> {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        match keys.get_mut(key.0) {
            Some(key) => {
                if key.is_some() {
                    *key = None;
                    Ok(())
                }
                else {
                    Err(KeyError::KeyNotFound)
                }
            }
            None => Err(KeyError::KeyNotFound)
        }
    }
}

impl Signer for EcdsaSigner {
    type KeyId = KeyId;
    type Error = io::Error;

    fn create_key(&self) -> Result<Self::KeyId, Self::Error> {
        Ok(self.insert_key(KeyPair::new(&self.rng)?))
    }

    fn get_key_info(
        &self,
        id: &Self::KeyId
    ) -> Result<PublicKey, KeyError<Self::Error>> {
        Ok(self.get_key(*id)?.get_key_info())
    }

    fn destroy_key(
        &self, key: &Self::KeyId
    ) -> Result<(), KeyError<Self::Error>> {
        self.delete_key(*key)
    }

    fn sign<D: AsRef<[u8]> + ?Sized>(
        &self,
        key: &Self::KeyId,
        algorithm: SignatureAlgorithm,
        data: &D
    ) -> Result<Signature, SigningError<Self::Error>> {
        self.get_key(*key)?.sign(
            algorithm, data.as_ref(), &self.rng
        ).map_err(Into::into)
    }
}

impl Default for EcdsaSigner {
    fn default() -> Self {
        Self::new()
    }
}


//------------ KeyId ---------------------------------------------------------

/// This signer’s key identifier.
//
//  We wrap this in a newtype so that people won’t start mucking about with
//  the integers.
#[derive(Clone, Copy, Debug)]
pub struct KeyId(usize);


//------------ KeyPair -------------------------------------------------------

/// A key pair kept by the signer.
struct KeyPair(EcdsaKeyPair);

impl KeyPair {
    fn new(rng: &rand::SystemRandom) -> Result<Self, io::Error> {
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(
            &ECDSA_P256_SHA256_ASN1_SIGNING, rng
        ).map_err(|_| {
            io::Error::new(io::ErrorKind::Other, "key generation failed")
        })?;
        Self::from_pkcs8(pkcs8.as_ref(), rng)
    }

    fn from_pkcs8(
        der: &[u8], rng: &rand::SystemRandom
    ) -> Result<Self, io::Error> {
        EcdsaKeyPair::from_pkcs8(
            &ECDSA_P256_SHA256_ASN1_SIGNING, der, rng
        ).map(KeyPair).map_err(|err| {
            io::Error::new(io::ErrorKind::InvalidData, err.to_string())
        })
    }

    fn get_key_info(&self) -> PublicKey {
        PublicKey::new(Bytes::copy_from_slice(self.0.public_key().as_ref()))
    }

    fn sign(
        &self,
        algorithm: SignatureAlgorithm,
        data: &[u8],
        rng: &rand::SystemRandom,
    ) -> Result<Signature, io::Error> {
        let signature = self.0.sign(rng, data).map_err(|_| {
            io::Error::new(io::ErrorKind::Other, "signing failed")
        })?;
        Ok(Signature::new(
            algorithm, Bytes::copy_from_slice(signature.as_ref())
        ))
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use ring::signature::{UnparsedPublicKey, ECDSA_P256_SHA256_ASN1};
    use super::*;

    #[test]
    fn sign_with_imported_key() {
        let signer = EcdsaSigner::new();
        let key = signer.key_from_der(
            include_bytes!("../../test-data/signer.key.der")
        ).unwrap();
        let public = signer.get_key_info(&key).unwrap();
        assert_eq!(public.bits().len(), 65);
        assert_eq!(public.bits()[0], 0x04);

        let sig = signer.sign(
            &key, SignatureAlgorithm::default(), b"registry"
        ).unwrap();
        assert_eq!(sig.value()[0], 0x30);
        UnparsedPublicKey::new(
            &ECDSA_P256_SHA256_ASN1, public.bits()
        ).verify(b"registry", sig.value()).unwrap();
    }

    #[test]
    fn key_lifecycle() {
        let signer = EcdsaSigner::new();
        let key = signer.create_key().unwrap();
        assert!(signer.get_key_info(&key).is_ok());
        signer.destroy_key(&key).unwrap();
        assert!(matches!(
            signer.get_key_info(&key), Err(KeyError::KeyNotFound)
        ));
        assert!(matches!(
            signer.sign(&key, SignatureAlgorithm::default(), b""),
            Err(SigningError::KeyNotFound)
        ));
        assert!(matches!(
            signer.destroy_key(&key), Err(KeyError::KeyNotFound)
        ));
    }

    #[test]
    fn reject_bad_keys() {
        let signer = EcdsaSigner::new();
        assert!(signer.key_from_der(b"\x30\x00").is_err());
        assert!(signer.key_from_pem(b"no armor").is_err());
    }
}
