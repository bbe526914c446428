//! BLAKE3 content hashing
//!
//! Single place that picks the digest used for fingerprints and content
//! identifiers across the workspace.

/// Hash arbitrary bytes to a 32-byte digest
pub fn hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash several byte strings as one message, with length framing
pub fn hash_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Short hex fingerprint suitable for log fields
pub fn fingerprint(data: &[u8]) -> String {
    hex::encode(&hash(data)[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash(b"attr1"), hash(b"attr1"));
        assert_ne!(hash(b"attr1"), hash(b"attr2"));
    }

    #[test]
    fn test_parts_are_framed() {
        assert_ne!(hash_parts(&[b"ab", b"c"]), hash_parts(&[b"a", b"bc"]));
    }

    #[test]
    fn test_fingerprint_length() {
        assert_eq!(fingerprint(b"key").len(), 16);
    }
}
