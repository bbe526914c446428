//! Encryption under an access tree, and decryption with a satisfying key
//!
//! Encryption shares a random root secret `s` down the tree with Shamir
//! polynomials (a `k`-of-`n` node gets a polynomial of degree `k - 1`, child
//! `i` receives the evaluation at `i`). Each leaf carries its share lifted into
//! `G1` and into the leaf attribute's `G2` point. The payload itself is sealed
//! under a key derived from a random target-group element `M`, which is
//! blinded by `e(g1, g2)^{αs}`.
//!
//! Decryption recombines only the minimal selection of leaves the key
//! satisfies, using Lagrange interpolation at zero at every internal node.

use crate::encoding::{decode, encode};
use crate::keys::DecryptionKey;
use crate::params::{ParamsId, PublicParams};
use crate::sealing::{open_with_element, seal_with_element, SealedBox};
use crate::sharing::{lagrange_at_zero, scalar, Polynomial};
use nac_core::{NacError, Result};
use nac_policy::{evaluate, satisfying_selection, AccessTree, Attribute, Selection};
use rabe_bn::{pairing, Fr, Gt, G1, G2};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};

/// Share material for one leaf, in depth-first leaf order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafShare {
    pub(crate) attribute: Attribute,
    /// `g1^{q_y(0)}`
    pub(crate) c: G1,
    /// `H_y^{q_y(0)}`
    pub(crate) c_prime: G2,
}

/// A policy-encrypted payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ciphertext {
    pub(crate) params_id: ParamsId,
    pub(crate) policy: AccessTree,
    /// `M · e(g1, g2)^{αs}`
    pub(crate) c_tilde: Gt,
    /// `h^s`
    pub(crate) c: G1,
    pub(crate) leaves: Vec<LeafShare>,
    pub(crate) sealed: SealedBox,
}

/// Encrypt `plaintext` so that only keys satisfying `policy` can recover it
///
/// Every call draws fresh randomness, so encrypting the same input twice
/// yields different ciphertexts.
pub fn encrypt<R: Rng + CryptoRng>(
    public: &PublicParams,
    policy: &AccessTree,
    plaintext: &[u8],
    rng: &mut R,
) -> Result<Ciphertext> {
    policy.validate()?;
    for attribute in policy.leaves() {
        if !public.contains(attribute) {
            return Err(NacError::unknown_attribute(attribute.as_str()));
        }
    }

    let s: Fr = rng.gen();
    let mut leaves = Vec::with_capacity(policy.leaf_count());
    share_secret(public, policy, s, &mut leaves, rng)?;

    let session = public.e_gg_alpha.pow(rng.gen::<Fr>());
    let c_tilde = session * public.e_gg_alpha.pow(s);
    let aad = nac_policy::to_bytes(policy)?;
    let sealed = seal_with_element(&session, plaintext, &aad, rng)?;

    tracing::trace!(
        params_id = %public.id,
        leaves = leaves.len(),
        "Encrypted payload under access tree"
    );

    Ok(Ciphertext {
        params_id: public.id,
        policy: policy.clone(),
        c_tilde,
        c: public.h * s,
        leaves,
        sealed,
    })
}

fn share_secret<R: Rng + CryptoRng>(
    public: &PublicParams,
    node: &AccessTree,
    secret: Fr,
    leaves: &mut Vec<LeafShare>,
    rng: &mut R,
) -> Result<()> {
    if let AccessTree::Leaf(attribute) = node {
        let point = public.attribute_point(attribute)?;
        leaves.push(LeafShare {
            attribute: attribute.clone(),
            c: public.g1 * secret,
            c_prime: point * secret,
        });
        return Ok(());
    }

    let polynomial = Polynomial::random(secret, node.required() - 1, rng);
    for (i, child) in node.children().iter().enumerate() {
        let share = polynomial.evaluate(scalar(i + 1)?);
        share_secret(public, child, share, leaves, rng)?;
    }
    Ok(())
}

/// Recover the plaintext with a key whose attributes satisfy the policy
///
/// Fails with [`NacError::PolicyNotSatisfied`] before any pairing work when
/// the key cannot satisfy the policy, and with
/// [`NacError::MalformedCiphertext`] when the ciphertext is inconsistent or
/// its sealed payload does not authenticate.
pub fn decrypt(key: &DecryptionKey, ciphertext: &Ciphertext) -> Result<Vec<u8>> {
    ciphertext.check_structure()?;
    if key.params_id != ciphertext.params_id {
        return Err(NacError::invalid(format!(
            "key issued under parameters {} cannot open ciphertext for {}",
            key.params_id, ciphertext.params_id
        )));
    }

    let held = key.attributes();
    if !evaluate(&ciphertext.policy, &held) {
        return Err(NacError::PolicyNotSatisfied);
    }
    let selection =
        satisfying_selection(&ciphertext.policy, &held).ok_or(NacError::PolicyNotSatisfied)?;

    let a = combine(key, ciphertext, &selection)?;
    let session = ciphertext.c_tilde * a * pairing(-ciphertext.c, key.d);

    let aad = nac_policy::to_bytes(&ciphertext.policy)?;
    open_with_element(&session, &ciphertext.sealed, &aad)
}

/// `e(g1, g2)^{r · q_x(0)}` for the selected subtree
fn combine(key: &DecryptionKey, ciphertext: &Ciphertext, selection: &Selection) -> Result<Gt> {
    match selection {
        Selection::Leaf { ordinal } => {
            let leaf = ciphertext
                .leaves
                .get(*ordinal)
                .ok_or_else(|| NacError::malformed_ciphertext("selection outside leaf shares"))?;
            let share = key
                .share(&leaf.attribute)
                .ok_or(NacError::PolicyNotSatisfied)?;
            Ok(pairing(leaf.c, share.d) * pairing(-share.d_prime, leaf.c_prime))
        }
        Selection::Node { children } => {
            let indices: Vec<usize> = children.iter().map(|child| child.index).collect();
            let mut acc = Gt::one();
            for child in children {
                let value = combine(key, ciphertext, &child.selection)?;
                acc = acc * value.pow(lagrange_at_zero(child.index, &indices)?);
            }
            Ok(acc)
        }
    }
}

impl Ciphertext {
    /// Parameter set the ciphertext was produced under
    pub fn params_id(&self) -> ParamsId {
        self.params_id
    }

    /// Policy the payload is locked under
    pub fn policy(&self) -> &AccessTree {
        &self.policy
    }

    /// Encode for storage or transmission
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    /// Decode and structurally validate a ciphertext
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let ciphertext: Self = decode(bytes, "ciphertext")
            .map_err(|e| NacError::malformed_ciphertext(e.to_string()))?;
        ciphertext.check_structure()?;
        Ok(ciphertext)
    }

    fn check_structure(&self) -> Result<()> {
        self.policy
            .validate()
            .map_err(|e| NacError::malformed_ciphertext(format!("embedded policy: {e}")))?;

        let expected = self.policy.leaves();
        if expected.len() != self.leaves.len() {
            return Err(NacError::malformed_ciphertext(format!(
                "policy has {} leaves but ciphertext carries {} shares",
                expected.len(),
                self.leaves.len()
            )));
        }
        if let Some(position) = expected
            .iter()
            .zip(&self.leaves)
            .position(|(attribute, leaf)| **attribute != leaf.attribute)
        {
            return Err(NacError::malformed_ciphertext(format!(
                "leaf share {position} does not match policy attribute"
            )));
        }
        Ok(())
    }
}
