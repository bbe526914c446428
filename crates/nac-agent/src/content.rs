//! Encrypted content envelope
//!
//! Content is sealed under a fresh symmetric key; only that key goes through
//! ABE. The content name is bound into the AEAD so an envelope cannot be
//! served under a different name.

use bincode::Options;
use nac_abe::{
    decrypt, encrypt, open_content, seal_content, Ciphertext, ContentKey, DecryptionKey,
    PublicParams, SealedBox,
};
use nac_core::{Name, NacError, Result};
use nac_policy::AccessTree;
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

const MAX_CONTENT_BYTES: u64 = 16 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(MAX_CONTENT_BYTES)
        .reject_trailing_bytes()
}

/// What a Producer stores and serves for one content name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedContent {
    name: Name,
    wrapped_key: Ciphertext,
    sealed: SealedBox,
}

impl EncryptedContent {
    /// Encrypt `plaintext` for consumers whose attributes satisfy `policy`
    pub fn seal<R: Rng + CryptoRng>(
        public: &PublicParams,
        policy: &AccessTree,
        name: Name,
        plaintext: &[u8],
        rng: &mut R,
    ) -> Result<Self> {
        let content_key = ContentKey::generate(rng);
        let wrapped_key = encrypt(public, policy, content_key.as_bytes(), rng)?;
        let sealed = seal_content(&content_key, plaintext, &name.encode(), rng)?;
        Ok(Self {
            name,
            wrapped_key,
            sealed,
        })
    }

    /// Recover the plaintext; `PolicyNotSatisfied` if `key` does not qualify
    pub fn open(&self, key: &DecryptionKey) -> Result<Vec<u8>> {
        let key_bytes = Zeroizing::new(decrypt(key, &self.wrapped_key)?);
        let content_key = ContentKey::from_slice(&key_bytes)
            .map_err(|_| NacError::malformed_ciphertext("wrapped content key has wrong length"))?;
        open_content(&content_key, &self.sealed, &self.name.encode())
    }

    /// Content name
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Policy the content key is encrypted under
    pub fn policy(&self) -> &AccessTree {
        self.wrapped_key.policy()
    }

    /// Wire form
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        options()
            .serialize(self)
            .map_err(|e| NacError::serialization(format!("encrypted content: {e}")))
    }

    /// Parse the wire form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        options()
            .deserialize(bytes)
            .map_err(|e| NacError::malformed_ciphertext(format!("encrypted content: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nac_abe::AbeAuthority;
    use nac_policy::{attribute_set, parse, Attribute, TreeNode};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn authority(rng: &mut ChaCha20Rng) -> AbeAuthority {
        let universe = attribute_set(["attr1", "attr2", "attr3"]).unwrap();
        AbeAuthority::setup(&universe, rng).unwrap()
    }

    fn keygen(authority: &AbeAuthority, tokens: &[&str], rng: &mut ChaCha20Rng) -> DecryptionKey {
        let attributes = attribute_set(tokens.iter().copied()).unwrap();
        authority.keygen(&attributes, rng).unwrap()
    }

    #[test]
    fn test_open_requires_satisfying_key() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let authority = authority(&mut rng);
        let name = Name::from_uri("/dataset1/example/item0").unwrap();
        let content = EncryptedContent::seal(
            authority.public_params(),
            &parse("attr1 and attr2").unwrap(),
            name,
            b"reading: 42",
            &mut rng,
        )
        .unwrap();

        let good = keygen(&authority, &["attr1", "attr2"], &mut rng);
        let bad = keygen(&authority, &["attr3"], &mut rng);
        let received = EncryptedContent::from_bytes(&content.to_bytes().unwrap()).unwrap();
        assert_eq!(received.open(&good).unwrap(), b"reading: 42");
        assert_eq!(received.open(&bad), Err(NacError::PolicyNotSatisfied));
    }

    #[test]
    fn test_renamed_content_fails_authentication() {
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let authority = authority(&mut rng);
        let mut content = EncryptedContent::seal(
            authority.public_params(),
            &parse("attr1").unwrap(),
            Name::from_uri("/dataset1/a").unwrap(),
            b"payload",
            &mut rng,
        )
        .unwrap();
        content.name = Name::from_uri("/dataset1/b").unwrap();

        let key = keygen(&authority, &["attr1"], &mut rng);
        assert!(matches!(
            content.open(&key),
            Err(NacError::MalformedCiphertext { .. })
        ));
    }

    #[test]
    fn test_deeply_nested_policy_is_malformed() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let authority = authority(&mut rng);
        let policy = parse("attr1 and attr2").unwrap();
        let bytes = EncryptedContent::seal(
            authority.public_params(),
            &policy,
            Name::from_uri("/dataset1/deep").unwrap(),
            b"payload",
            &mut rng,
        )
        .unwrap()
        .to_bytes()
        .unwrap();

        let original = &nac_policy::to_bytes(&policy).unwrap()[1..];
        let at = bytes
            .windows(original.len())
            .position(|window| window == original)
            .unwrap();
        let mut nodes = vec![TreeNode::Leaf(Attribute::new("attr1").unwrap())];
        nodes.extend(std::iter::repeat(TreeNode::Or { arity: 1 }).take(100_000));
        let mut hostile = bytes[..at].to_vec();
        hostile.extend(bincode::DefaultOptions::new().serialize(&nodes).unwrap());
        hostile.extend_from_slice(&bytes[at + original.len()..]);

        assert!(matches!(
            EncryptedContent::from_bytes(&hostile),
            Err(NacError::MalformedCiphertext { .. })
        ));
    }
}
