//! Decryption keys

use crate::encoding::{decode, encode};
use crate::params::{MasterParams, ParamsId, PublicParams};
use nac_core::{NacError, Result};
use nac_policy::{Attribute, AttributeSet};
use rabe_bn::{Fr, G1, G2};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key material for one attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeKeyShare {
    /// `g2^r · H_j^{r_j}`
    pub(crate) d: G2,
    /// `g1^{r_j}`
    pub(crate) d_prime: G1,
}

/// A consumer's decryption key: one share per granted attribute plus the
/// set-wide component tying the shares together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecryptionKey {
    pub(crate) params_id: ParamsId,
    /// `g2^{(α + r) / β}`
    pub(crate) d: G2,
    pub(crate) shares: BTreeMap<Attribute, AttributeKeyShare>,
}

/// Issue a key for `attributes`
///
/// All shares of one key use the same blinding `r`, so shares from two
/// different keys cannot be combined.
pub fn keygen<R: Rng + CryptoRng>(
    public: &PublicParams,
    master: &MasterParams,
    attributes: &AttributeSet,
    rng: &mut R,
) -> Result<DecryptionKey> {
    if public.id != master.id {
        return Err(NacError::invalid(
            "public and master parameters come from different setups",
        ));
    }
    if attributes.is_empty() {
        return Err(NacError::invalid("cannot issue a key for an empty attribute set"));
    }

    let beta_inverse = master
        .beta
        .inverse()
        .ok_or_else(|| NacError::crypto("master exponent is not invertible"))?;
    let r: Fr = rng.gen();
    let g2_r = public.g2 * r;

    let mut shares = BTreeMap::new();
    for attribute in attributes {
        let point = public.attribute_point(attribute)?;
        let r_j: Fr = rng.gen();
        shares.insert(
            attribute.clone(),
            AttributeKeyShare {
                d: g2_r + point * r_j,
                d_prime: public.g1 * r_j,
            },
        );
    }

    tracing::debug!(
        params_id = %public.id,
        attributes = attributes.len(),
        "Issued decryption key"
    );

    Ok(DecryptionKey {
        params_id: public.id,
        d: (master.g2_alpha + g2_r) * beta_inverse,
        shares,
    })
}

impl DecryptionKey {
    /// Parameter set the key was issued under
    pub fn params_id(&self) -> ParamsId {
        self.params_id
    }

    /// Attributes the key holds shares for
    pub fn attributes(&self) -> AttributeSet {
        self.shares.keys().cloned().collect()
    }

    pub(crate) fn share(&self, attribute: &Attribute) -> Option<&AttributeKeyShare> {
        self.shares.get(attribute)
    }

    /// Encode for delivery to the consumer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    /// Decode a delivered key
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let key: Self = decode(bytes, "decryption key")?;
        if key.shares.is_empty() {
            return Err(NacError::serialization("decryption key carries no attribute shares"));
        }
        Ok(key)
    }
}
