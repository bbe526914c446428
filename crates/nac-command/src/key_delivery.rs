//! Confidential delivery of decryption keys
//!
//! Command names are public, so a decryption key cannot travel in clear. The
//! consumer puts a fresh X25519 public value in its `FETCH_KEY` payload; the
//! authority answers with its own ephemeral value and the key sealed under
//! the Diffie-Hellman shared secret.

use bincode::Options;
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use curve25519_dalek::montgomery::MontgomeryPoint;
use nac_core::{NacError, Result};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

const KEY_DELIVERY_CONTEXT: &str = "nac-command 2024 decryption key delivery";
const MAX_MESSAGE_BYTES: u64 = 4 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(MAX_MESSAGE_BYTES)
        .reject_trailing_bytes()
}

/// Requester-side ephemeral secret; consumed by [`KeyRequestSecret::open`]
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyRequestSecret {
    secret: [u8; 32],
}

/// `FETCH_KEY` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRequest {
    /// Requester's ephemeral X25519 public value
    pub ephemeral: [u8; 32],
}

/// `FETCH_KEY` reply body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKey {
    /// Authority's ephemeral X25519 public value
    pub ephemeral: [u8; 32],
    /// AEAD nonce
    pub nonce: [u8; 12],
    /// Sealed key bytes with tag
    pub ciphertext: Vec<u8>,
}

impl std::fmt::Debug for KeyRequestSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyRequestSecret([REDACTED])")
    }
}

fn derive_key(
    shared: &MontgomeryPoint,
    sender: &[u8; 32],
    recipient: &[u8; 32],
) -> Result<[u8; 32]> {
    if shared.as_bytes().iter().all(|b| *b == 0) {
        return Err(NacError::crypto("degenerate key agreement"));
    }
    let mut material = Vec::with_capacity(96);
    material.extend_from_slice(shared.as_bytes());
    material.extend_from_slice(sender);
    material.extend_from_slice(recipient);
    let key = blake3::derive_key(KEY_DELIVERY_CONTEXT, &material);
    material.zeroize();
    Ok(key)
}

impl KeyRequest {
    /// Fresh request and the secret needed to open the answer
    pub fn generate<R: Rng + CryptoRng>(rng: &mut R) -> (Self, KeyRequestSecret) {
        let secret: [u8; 32] = rng.gen();
        let ephemeral = MontgomeryPoint::mul_base_clamped(secret).to_bytes();
        (Self { ephemeral }, KeyRequestSecret { secret })
    }

    /// Encode as a command payload
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(options().serialize(self)?)
    }

    /// Decode a command payload
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        options()
            .deserialize(bytes)
            .map_err(|e| NacError::invalid(format!("malformed key request: {e}")))
    }

    /// Seal `key_bytes` to this requester; `aad` binds the request context
    pub fn seal<R: Rng + CryptoRng>(
        &self,
        key_bytes: &[u8],
        aad: &[u8],
        rng: &mut R,
    ) -> Result<SealedKey> {
        let mut secret: [u8; 32] = rng.gen();
        let ephemeral = MontgomeryPoint::mul_base_clamped(secret).to_bytes();
        let shared = MontgomeryPoint(self.ephemeral).mul_clamped(secret);
        secret.zeroize();

        let mut key = derive_key(&shared, &ephemeral, &self.ephemeral)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        key.zeroize();

        let nonce: [u8; 12] = rng.gen();
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), Payload { msg: key_bytes, aad })
            .map_err(|e| NacError::crypto(format!("key sealing failed: {e}")))?;
        Ok(SealedKey {
            ephemeral,
            nonce,
            ciphertext,
        })
    }
}

impl KeyRequestSecret {
    /// Open the authority's answer
    pub fn open(&self, sealed: &SealedKey, aad: &[u8]) -> Result<Vec<u8>> {
        let own = MontgomeryPoint::mul_base_clamped(self.secret).to_bytes();
        let shared = MontgomeryPoint(sealed.ephemeral).mul_clamped(self.secret);
        let mut key = derive_key(&shared, &sealed.ephemeral, &own)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        key.zeroize();
        cipher
            .decrypt(
                Nonce::from_slice(&sealed.nonce),
                Payload {
                    msg: &sealed.ciphertext,
                    aad,
                },
            )
            .map_err(|_| NacError::crypto("sealed key failed authentication"))
    }
}

impl SealedKey {
    /// Encode as a reply body
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(options().serialize(self)?)
    }

    /// Decode a reply body
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        options()
            .deserialize(bytes)
            .map_err(|e| NacError::invalid(format!("malformed sealed key: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_round_trip() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let (request, secret) = KeyRequest::generate(&mut rng);
        let request = KeyRequest::from_bytes(&request.to_bytes().unwrap()).unwrap();
        let sealed = request.seal(b"decryption key", b"/consumer", &mut rng).unwrap();
        let sealed = SealedKey::from_bytes(&sealed.to_bytes().unwrap()).unwrap();
        assert_eq!(secret.open(&sealed, b"/consumer").unwrap(), b"decryption key");
    }

    #[test]
    fn test_other_requester_cannot_open() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let (request, _) = KeyRequest::generate(&mut rng);
        let (_, eavesdropper) = KeyRequest::generate(&mut rng);
        let sealed = request.seal(b"decryption key", b"", &mut rng).unwrap();
        assert!(eavesdropper.open(&sealed, b"").is_err());
    }

    #[test]
    fn test_context_is_bound() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let (request, secret) = KeyRequest::generate(&mut rng);
        let sealed = request.seal(b"k", b"/consumer/a", &mut rng).unwrap();
        assert!(secret.open(&sealed, b"/consumer/b").is_err());
    }

    #[test]
    fn test_low_order_point_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let request = KeyRequest { ephemeral: [0u8; 32] };
        assert!(request.seal(b"k", b"", &mut rng).is_err());
    }
}
