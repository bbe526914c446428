//! Identities, certificates and trust anchors
//!
//! Certificate issuance and chain validation are out of scope: a
//! [`Certificate`] here is simply an identity name bound to an Ed25519
//! verifying key, and the [`TrustStore`] holds the certificates a node has
//! decided to trust.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};
use nac_core::{hash::fingerprint, Name, NacError, Result};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Component separating an identity from its key id in a key name
pub const KEY_COMPONENT: &str = "KEY";

/// An identity name bound to a verifying key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    identity: Name,
    verifying_key: VerifyingKey,
}

impl Certificate {
    /// Bind `identity` to `verifying_key`
    pub fn new(identity: Name, verifying_key: VerifyingKey) -> Self {
        Self {
            identity,
            verifying_key,
        }
    }

    /// Identity the certificate speaks for
    pub fn identity(&self) -> &Name {
        &self.identity
    }

    /// Verifying key
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// `<identity>/KEY/<key id>`, the key locator carried in signatures
    pub fn key_name(&self) -> Name {
        self.identity
            .clone()
            .append(KEY_COMPONENT)
            .append(fingerprint(self.verifying_key.as_bytes()))
    }

    /// Verify `signature` over `data`
    pub fn verify(&self, data: &[u8], signature: &Signature) -> Result<()> {
        self.verifying_key
            .verify(data, signature)
            .map_err(|e| NacError::signature_invalid(format!("{}: {e}", self.identity)))
    }
}

/// Something that can sign command and reply names
pub trait Signer: Send + Sync + fmt::Debug {
    /// Certificate matching the signing key
    fn certificate(&self) -> &Certificate;

    /// Sign `data`
    fn sign(&self, data: &[u8]) -> Signature;

    /// Key locator placed in signature info
    fn key_locator(&self) -> Name {
        self.certificate().key_name()
    }
}

/// Ed25519 signing identity
pub struct Ed25519Identity {
    signing_key: SigningKey,
    certificate: Certificate,
}

impl Ed25519Identity {
    /// Fresh identity with a random key
    pub fn generate<R: RngCore + CryptoRng>(identity: Name, rng: &mut R) -> Self {
        Self::from_signing_key(identity, SigningKey::generate(rng))
    }

    /// Identity from a 32-byte secret seed
    pub fn from_seed(identity: Name, seed: &[u8; 32]) -> Self {
        Self::from_signing_key(identity, SigningKey::from_bytes(seed))
    }

    fn from_signing_key(identity: Name, signing_key: SigningKey) -> Self {
        let certificate = Certificate::new(identity, signing_key.verifying_key());
        Self {
            signing_key,
            certificate,
        }
    }

    /// Identity name
    pub fn identity(&self) -> &Name {
        self.certificate.identity()
    }
}

impl fmt::Debug for Ed25519Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Identity")
            .field("identity", &self.certificate.identity.to_uri())
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

impl Signer for Ed25519Identity {
    fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    fn sign(&self, data: &[u8]) -> Signature {
        self.signing_key.sign(data)
    }
}

/// Trusted certificates, indexed by identity
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    certificates: BTreeMap<Name, Certificate>,
}

impl TrustStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `certificate`, replacing any previous one for its identity
    pub fn insert(&mut self, certificate: Certificate) {
        self.certificates
            .insert(certificate.identity().clone(), certificate);
    }

    /// Certificate whose identity is the longest prefix of `name`
    ///
    /// Used to find who is expected to answer a command sent to `name`.
    pub fn lookup(&self, name: &Name) -> Option<&Certificate> {
        (0..=name.len())
            .rev()
            .find_map(|len| self.certificates.get(&name.prefix(len)))
    }

    /// Certificate whose key name equals `key_locator`
    pub fn by_key_locator(&self, key_locator: &Name) -> Result<&Certificate> {
        let identity = key_locator
            .len()
            .checked_sub(2)
            .map(|len| key_locator.prefix(len))
            .ok_or_else(|| {
                NacError::signature_invalid(format!("malformed key locator {key_locator}"))
            })?;
        self.certificates
            .get(&identity)
            .filter(|cert| &cert.key_name() == key_locator)
            .ok_or_else(|| {
                NacError::signature_invalid(format!("untrusted key locator {key_locator}"))
            })
    }

    /// Number of trusted identities
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn identity(uri: &str, seed: u64) -> Ed25519Identity {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        Ed25519Identity::generate(Name::from_uri(uri).unwrap(), &mut rng)
    }

    #[test]
    fn test_sign_and_verify() {
        let owner = identity("/owner", 1);
        let signature = owner.sign(b"payload");
        assert!(owner.certificate().verify(b"payload", &signature).is_ok());
        assert!(owner.certificate().verify(b"other", &signature).is_err());
    }

    #[test]
    fn test_key_name_shape() {
        let owner = identity("/owner", 2);
        let key_name = owner.key_locator();
        assert_eq!(key_name.len(), 3);
        assert!(owner.identity().is_prefix_of(&key_name));
        assert_eq!(key_name.get(1).unwrap().as_str(), Some(KEY_COMPONENT));
    }

    #[test]
    fn test_lookup_uses_longest_prefix() {
        let mut store = TrustStore::new();
        let producer = identity("/producer", 3);
        let sub = identity("/producer/lab", 4);
        store.insert(producer.certificate().clone());
        store.insert(sub.certificate().clone());

        let name = Name::from_uri("/producer/lab/SET_POLICY/x").unwrap();
        assert_eq!(store.lookup(&name).unwrap(), sub.certificate());
        let name = Name::from_uri("/producer/SET_POLICY/x").unwrap();
        assert_eq!(store.lookup(&name).unwrap(), producer.certificate());
        assert!(store.lookup(&Name::from_uri("/other").unwrap()).is_none());
    }

    #[test]
    fn test_by_key_locator_requires_matching_key() {
        let mut store = TrustStore::new();
        let owner = identity("/owner", 5);
        let impostor = identity("/owner", 6);
        store.insert(owner.certificate().clone());
        assert!(store.by_key_locator(&owner.key_locator()).is_ok());
        assert!(store.by_key_locator(&impostor.key_locator()).is_err());
        assert!(store.by_key_locator(&Name::new()).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let owner = identity("/owner", 7);
        assert!(format!("{owner:?}").contains("REDACTED"));
    }
}
