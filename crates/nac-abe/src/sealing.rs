//! Symmetric sealing for content keys and content
//!
//! ChaCha20-Poly1305 with BLAKE3-derived keys. The ABE layer never encrypts
//! payload bytes directly: it blinds a random target-group element, and the
//! content key is sealed under a key derived from that element.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use nac_core::{NacError, Result};
use rabe_bn::Gt;
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

const SESSION_CONTEXT: &str = "nac-abe 2024 session element -> content key wrap";
const CONTENT_CONTEXT: &str = "nac-abe 2024 content key -> content seal";

/// AEAD output with its nonce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBox {
    /// Random 96-bit nonce
    pub nonce: [u8; 12],
    /// Ciphertext with appended Poly1305 tag
    pub ciphertext: Vec<u8>,
}

/// Symmetric key protecting one piece of content
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    /// Fresh random key
    pub fn generate<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        Self(rng.gen())
    }

    /// Wrap existing key bytes; must be exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let key: [u8; 32] = bytes.try_into().map_err(|_| {
            NacError::invalid(format!(
                "content key must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey([REDACTED])")
    }
}

fn seal_with_key<R: Rng + CryptoRng>(
    key: &[u8; 32],
    plaintext: &[u8],
    aad: &[u8],
    rng: &mut R,
) -> Result<SealedBox> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce: [u8; 12] = rng.gen();
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| NacError::crypto(format!("ChaCha20-Poly1305 encryption failed: {e}")))?;
    Ok(SealedBox { nonce, ciphertext })
}

fn open_with_key(key: &[u8; 32], sealed: &SealedBox, aad: &[u8]) -> Option<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(
            Nonce::from_slice(&sealed.nonce),
            Payload {
                msg: &sealed.ciphertext,
                aad,
            },
        )
        .ok()
}

fn session_key(element: &Gt) -> Result<[u8; 32]> {
    let mut encoded = bincode::serialize(element)?;
    let key = blake3::derive_key(SESSION_CONTEXT, &encoded);
    encoded.zeroize();
    Ok(key)
}

/// Seal `plaintext` under a key derived from a target-group element
pub(crate) fn seal_with_element<R: Rng + CryptoRng>(
    element: &Gt,
    plaintext: &[u8],
    aad: &[u8],
    rng: &mut R,
) -> Result<SealedBox> {
    let mut key = session_key(element)?;
    let sealed = seal_with_key(&key, plaintext, aad, rng);
    key.zeroize();
    sealed
}

/// Open a box sealed by [`seal_with_element`]
pub(crate) fn open_with_element(element: &Gt, sealed: &SealedBox, aad: &[u8]) -> Result<Vec<u8>> {
    let mut key = session_key(element)?;
    let opened = open_with_key(&key, sealed, aad);
    key.zeroize();
    opened.ok_or_else(|| NacError::malformed_ciphertext("content key authentication failed"))
}

/// Seal content bytes under a content key; `aad` binds the content name
pub fn seal_content<R: Rng + CryptoRng>(
    key: &ContentKey,
    plaintext: &[u8],
    aad: &[u8],
    rng: &mut R,
) -> Result<SealedBox> {
    let mut derived = blake3::derive_key(CONTENT_CONTEXT, key.as_bytes());
    let sealed = seal_with_key(&derived, plaintext, aad, rng);
    derived.zeroize();
    sealed
}

/// Open content sealed by [`seal_content`]
pub fn open_content(key: &ContentKey, sealed: &SealedBox, aad: &[u8]) -> Result<Vec<u8>> {
    let mut derived = blake3::derive_key(CONTENT_CONTEXT, key.as_bytes());
    let opened = open_with_key(&derived, sealed, aad);
    derived.zeroize();
    opened.ok_or_else(|| NacError::malformed_ciphertext("content authentication failed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_content_seal_open() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let key = ContentKey::generate(&mut rng);
        let sealed =
            seal_content(&key, b"temperature=21.5", b"/producer/dataset1", &mut rng).unwrap();
        let opened = open_content(&key, &sealed, b"/producer/dataset1").unwrap();
        assert_eq!(opened, b"temperature=21.5");
    }

    #[test]
    fn test_content_bound_to_aad() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let key = ContentKey::generate(&mut rng);
        let sealed = seal_content(&key, b"payload", b"/a", &mut rng).unwrap();
        assert!(open_content(&key, &sealed, b"/b").is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let key = ContentKey::generate(&mut rng);
        let other = ContentKey::generate(&mut rng);
        let sealed = seal_content(&key, b"payload", b"", &mut rng).unwrap();
        assert!(open_content(&other, &sealed, b"").is_err());
    }

    #[test]
    fn test_content_key_length_checked() {
        assert!(ContentKey::from_slice(&[0u8; 31]).is_err());
        assert!(ContentKey::from_slice(&[0u8; 32]).is_ok());
        let key = ContentKey::from_slice(&[1u8; 32]).unwrap();
        assert_eq!(format!("{key:?}"), "ContentKey([REDACTED])");
    }
}
