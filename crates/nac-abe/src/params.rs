//! Public and master parameters
//!
//! The attribute universe is bounded: every attribute an authority can issue
//! gets its own random `G2` point at setup time. Keys and ciphertexts are only
//! meaningful against the parameter set whose `id` they carry.

use crate::encoding::{decode, encode};
use nac_core::{NacError, Result};
use nac_policy::{Attribute, AttributeSet};
use rabe_bn::{pairing, Fr, Group, Gt, G1, G2};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier binding keys and ciphertexts to one setup run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParamsId(pub [u8; 16]);

impl fmt::Display for ParamsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Authority public parameters, safe to distribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicParams {
    pub(crate) id: ParamsId,
    pub(crate) g1: G1,
    pub(crate) g2: G2,
    /// `g1^β`
    pub(crate) h: G1,
    /// `e(g1, g2)^α`
    pub(crate) e_gg_alpha: Gt,
    pub(crate) attributes: BTreeMap<Attribute, G2>,
}

/// Authority secret parameters
///
/// Deliberately not serializable.
#[derive(Clone)]
pub struct MasterParams {
    pub(crate) id: ParamsId,
    pub(crate) beta: Fr,
    /// `g2^α`
    pub(crate) g2_alpha: G2,
}

impl fmt::Debug for MasterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterParams")
            .field("id", &self.id)
            .field("secrets", &"[REDACTED]")
            .finish()
    }
}

impl MasterParams {
    /// Parameter set these secrets belong to
    pub fn id(&self) -> ParamsId {
        self.id
    }
}

/// Generate a fresh parameter pair for the given attribute universe
pub fn setup<R: Rng + CryptoRng>(
    universe: &AttributeSet,
    rng: &mut R,
) -> Result<(PublicParams, MasterParams)> {
    if universe.is_empty() {
        return Err(NacError::invalid("attribute universe must not be empty"));
    }

    let g1 = G1::one() * rng.gen::<Fr>();
    let g2 = G2::one() * rng.gen::<Fr>();
    let alpha: Fr = rng.gen();
    let beta: Fr = rng.gen();
    if beta == Fr::zero() {
        return Err(NacError::crypto("degenerate setup exponent"));
    }

    let attributes = universe
        .iter()
        .map(|attribute| (attribute.clone(), G2::one() * rng.gen::<Fr>()))
        .collect();
    let id = ParamsId(rng.gen());

    let public = PublicParams {
        id,
        g1,
        g2,
        h: g1 * beta,
        e_gg_alpha: pairing(g1, g2).pow(alpha),
        attributes,
    };
    let master = MasterParams {
        id,
        beta,
        g2_alpha: g2 * alpha,
    };

    tracing::debug!(params_id = %id, universe = universe.len(), "ABE setup complete");
    Ok((public, master))
}

impl PublicParams {
    /// Parameter set identifier
    pub fn id(&self) -> ParamsId {
        self.id
    }

    /// Attributes this parameter set can issue keys for
    pub fn universe(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.keys()
    }

    /// Whether `attribute` belongs to the universe
    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.attributes.contains_key(attribute)
    }

    pub(crate) fn attribute_point(&self, attribute: &Attribute) -> Result<G2> {
        self.attributes
            .get(attribute)
            .copied()
            .ok_or_else(|| NacError::unknown_attribute(attribute.as_str()))
    }

    /// Encode for distribution
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    /// Decode distributed parameters
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let params: Self = decode(bytes, "public parameters")?;
        if params.attributes.is_empty() {
            return Err(NacError::serialization("public parameters carry no attributes"));
        }
        Ok(params)
    }
}
