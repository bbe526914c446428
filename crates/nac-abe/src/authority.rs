//! Authority context object
//!
//! Each `AbeAuthority` owns exactly one parameter pair. There is no global
//! scheme state, so several authorities can live in the same process.

use crate::keys::{keygen, DecryptionKey};
use crate::params::{setup, MasterParams, PublicParams};
use nac_core::{AuthorityConfig, Result};
use nac_policy::{attribute_set, AttributeSet};
use rand::{CryptoRng, Rng};

/// Key-issuing authority for one attribute universe
#[derive(Debug, Clone)]
pub struct AbeAuthority {
    public: PublicParams,
    master: MasterParams,
}

impl AbeAuthority {
    /// Run setup for `universe`
    pub fn setup<R: Rng + CryptoRng>(universe: &AttributeSet, rng: &mut R) -> Result<Self> {
        let (public, master) = setup(universe, rng)?;
        Ok(Self { public, master })
    }

    /// Run setup for the universe named in configuration
    pub fn from_config<R: Rng + CryptoRng>(config: &AuthorityConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let universe = attribute_set(config.attribute_universe.iter().map(String::as_str))?;
        Self::setup(&universe, rng)
    }

    /// Parameters to hand to producers and consumers
    pub fn public_params(&self) -> &PublicParams {
        &self.public
    }

    /// Issue a decryption key for `attributes`
    pub fn keygen<R: Rng + CryptoRng>(
        &self,
        attributes: &AttributeSet,
        rng: &mut R,
    ) -> Result<DecryptionKey> {
        keygen(&self.public, &self.master, attributes, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nac_core::NacError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_from_config() {
        let mut rng = ChaCha20Rng::seed_from_u64(41);
        let config = AuthorityConfig {
            attribute_universe: vec!["attr1".into(), "attr2".into()],
        };
        let authority = AbeAuthority::from_config(&config, &mut rng).unwrap();
        assert_eq!(authority.public_params().universe().count(), 2);
    }

    #[test]
    fn test_from_config_rejects_empty_universe() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        assert!(AbeAuthority::from_config(&AuthorityConfig::default(), &mut rng).is_err());
    }

    #[test]
    fn test_from_config_rejects_reserved_word() {
        let mut rng = ChaCha20Rng::seed_from_u64(43);
        let config = AuthorityConfig {
            attribute_universe: vec!["and".into()],
        };
        assert!(matches!(
            AbeAuthority::from_config(&config, &mut rng),
            Err(NacError::PolicySyntax { .. })
        ));
    }

    #[test]
    fn test_authorities_are_independent() {
        let mut rng = ChaCha20Rng::seed_from_u64(44);
        let universe = attribute_set(["a"]).unwrap();
        let first = AbeAuthority::setup(&universe, &mut rng).unwrap();
        let second = AbeAuthority::setup(&universe, &mut rng).unwrap();
        assert_ne!(first.public_params().id(), second.public_params().id());
        let key = first.keygen(&universe, &mut rng).unwrap();
        assert_eq!(key.params_id(), first.public_params().id());
    }
}
