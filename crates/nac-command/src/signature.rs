//! Signature info carried as the last name component
//!
//! The signed input is domain-separated and covers the structural encoding of
//! everything the signature protects plus the signature-info metadata, so a
//! signature can neither be moved to another name nor have its timestamp
//! rewritten.

use crate::identity::{Certificate, Signer};
use bincode::Options;
use ed25519_dalek::Signature;
use nac_core::{Component, Name, NacError, Result};
use serde::{Deserialize, Serialize};

const COMMAND_DOMAIN: &[u8] = b"nac-command/v1/request";
const REPLY_DOMAIN: &[u8] = b"nac-command/v1/reply";

/// Upper bound on an encoded signature info component
const MAX_SIGNATURE_INFO_BYTES: u64 = 4 * 1024;

/// What a signature is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignedKind {
    Request,
    Reply,
}

impl SignedKind {
    fn domain(self) -> &'static [u8] {
        match self {
            SignedKind::Request => COMMAND_DOMAIN,
            SignedKind::Reply => REPLY_DOMAIN,
        }
    }
}

/// Signature metadata and value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    /// Key name of the signer, `<identity>/KEY/<key id>`
    pub key_locator: Name,
    /// Signing time in milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    /// Random value making otherwise identical commands distinct
    pub nonce: u64,
    /// Ed25519 signature bytes
    pub value: Vec<u8>,
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(MAX_SIGNATURE_INFO_BYTES)
        .reject_trailing_bytes()
}

impl SignatureInfo {
    /// Encode as a name component
    pub fn to_component(&self) -> Result<Component> {
        Ok(Component::new(options().serialize(self)?))
    }

    /// Decode from a name component
    pub fn from_component(component: &Component) -> Result<Self> {
        options()
            .deserialize(component.as_bytes())
            .map_err(|e| NacError::signature_invalid(format!("malformed signature info: {e}")))
    }

    /// Signer identity implied by the key locator
    pub fn signer_identity(&self) -> Option<Name> {
        self.key_locator
            .len()
            .checked_sub(2)
            .map(|len| self.key_locator.prefix(len))
    }
}

pub(crate) fn signed_input(
    kind: SignedKind,
    covered: &[&[u8]],
    key_locator: &Name,
    timestamp_ms: u64,
    nonce: u64,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(kind.domain());
    for part in covered {
        let len = u32::try_from(part.len()).unwrap_or(u32::MAX);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(part);
    }
    let locator = key_locator.encode();
    out.extend_from_slice(&u32::try_from(locator.len()).unwrap_or(u32::MAX).to_be_bytes());
    out.extend_from_slice(&locator);
    out.extend_from_slice(&timestamp_ms.to_be_bytes());
    out.extend_from_slice(&nonce.to_be_bytes());
    out
}

pub(crate) fn sign(
    kind: SignedKind,
    covered: &[&[u8]],
    signer: &dyn Signer,
    timestamp_ms: u64,
    nonce: u64,
) -> SignatureInfo {
    let key_locator = signer.key_locator();
    let input = signed_input(kind, covered, &key_locator, timestamp_ms, nonce);
    SignatureInfo {
        key_locator,
        timestamp_ms,
        nonce,
        value: signer.sign(&input).to_bytes().to_vec(),
    }
}

pub(crate) fn verify(
    kind: SignedKind,
    covered: &[&[u8]],
    info: &SignatureInfo,
    certificate: &Certificate,
) -> Result<()> {
    let expected = certificate.key_name();
    if info.key_locator != expected {
        return Err(NacError::signature_invalid(format!(
            "signed by {} but expected {}",
            info.key_locator, expected
        )));
    }
    let signature = Signature::from_slice(&info.value)
        .map_err(|e| NacError::signature_invalid(format!("malformed signature value: {e}")))?;
    let input = signed_input(kind, covered, &info.key_locator, info.timestamp_ms, info.nonce);
    certificate.verify(&input, &signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Ed25519Identity;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const NAME: &[u8] = b"name";

    fn signer(seed: u64) -> Ed25519Identity {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        Ed25519Identity::generate(Name::from_uri("/owner").unwrap(), &mut rng)
    }

    #[test]
    fn test_sign_verify() {
        let owner = signer(1);
        let info = sign(SignedKind::Request, &[NAME], &owner, 1_000, 7);
        assert!(verify(SignedKind::Request, &[NAME], &info, owner.certificate()).is_ok());
    }

    #[test]
    fn test_domains_are_separated() {
        let owner = signer(2);
        let info = sign(SignedKind::Request, &[NAME], &owner, 1_000, 7);
        assert!(verify(SignedKind::Reply, &[NAME], &info, owner.certificate()).is_err());
    }

    #[test]
    fn test_metadata_is_covered() {
        let owner = signer(3);
        let mut info = sign(SignedKind::Request, &[NAME], &owner, 1_000, 7);
        info.timestamp_ms += 1;
        assert!(verify(SignedKind::Request, &[NAME], &info, owner.certificate()).is_err());
    }

    #[test]
    fn test_component_round_trip() {
        let owner = signer(4);
        let info = sign(SignedKind::Reply, &[NAME, b"b".as_slice()], &owner, 5, 9);
        let decoded = SignatureInfo::from_component(&info.to_component().unwrap()).unwrap();
        assert_eq!(decoded, info);
        assert_eq!(decoded.signer_identity().unwrap(), *owner.identity());
        assert!(SignatureInfo::from_component(&Component::from("junk")).is_err());
    }

    #[test]
    fn test_wrong_certificate_rejected() {
        let owner = signer(5);
        let other = signer(6);
        let info = sign(SignedKind::Request, &[NAME], &owner, 1, 1);
        assert!(matches!(
            verify(SignedKind::Request, &[NAME], &info, other.certificate()),
            Err(NacError::SignatureInvalid { .. })
        ));
    }
}
