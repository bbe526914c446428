//! Deterministic identities and inputs

use nac_abe::AbeAuthority;
use nac_command::Ed25519Identity;
use nac_core::Name;
use nac_policy::{attribute_set, AttributeSet};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Parse a name, panicking on malformed test input
pub fn name(uri: &str) -> Name {
    match Name::from_uri(uri) {
        Ok(name) => name,
        Err(err) => panic!("bad test name {uri}: {err}"),
    }
}

/// Identity whose key is derived from its own name, so every test run and
/// every party computes the same certificate
pub fn identity(uri: &str) -> Ed25519Identity {
    let seed = nac_core::hash::hash_parts(&[b"nac-testkit identity".as_slice(), uri.as_bytes()]);
    Ed25519Identity::from_seed(name(uri), &seed)
}

/// Reproducible CSPRNG
pub fn seeded_rng(seed: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed)
}

/// Attribute set from tokens, panicking on invalid test input
pub fn universe(tokens: &[&str]) -> AttributeSet {
    match attribute_set(tokens.iter().copied()) {
        Ok(set) => set,
        Err(err) => panic!("bad test attributes {tokens:?}: {err}"),
    }
}

/// ABE authority over `tokens` with reproducible parameters
pub fn abe_authority(tokens: &[&str], seed: u64) -> AbeAuthority {
    match AbeAuthority::setup(&universe(tokens), &mut seeded_rng(seed)) {
        Ok(authority) => authority,
        Err(err) => panic!("authority setup failed: {err}"),
    }
}
