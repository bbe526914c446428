//! Transmissible byte form of access trees
//!
//! Trees travel inside ciphertexts. On the wire a tree is its postorder node
//! list: every gate follows its operands and records how many it takes.
//! Decoding rebuilds the tree with an explicit stack and refuses nesting past
//! [`MAX_DEPTH`] before any deeper node exists, so hostile bytes cannot drive
//! recursion. [`from_bytes`] then re-checks every structural invariant, so a
//! tree obtained from bytes is as trustworthy as one from `parse`.

use crate::attribute::Attribute;
use crate::tree::{AccessTree, MAX_DEPTH};
use bincode::Options;
use nac_core::{NacError, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Current encoding version
pub const TREE_ENCODING_VERSION: u8 = 1;

/// Upper bound on an encoded tree
pub const MAX_TREE_BYTES: u64 = 64 * 1024;

/// One entry of the postorder wire form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Attribute leaf
    Leaf(Attribute),
    /// AND over the preceding `arity` subtrees
    And {
        /// Operand count
        arity: usize,
    },
    /// OR over the preceding `arity` subtrees
    Or {
        /// Operand count
        arity: usize,
    },
    /// `threshold`-of-`arity` over the preceding subtrees
    Threshold {
        /// Operands that must be satisfied
        threshold: usize,
        /// Operand count
        arity: usize,
    },
}

impl TreeNode {
    fn arity(&self) -> usize {
        match self {
            Self::Leaf(_) => 0,
            Self::And { arity } | Self::Or { arity } | Self::Threshold { arity, .. } => *arity,
        }
    }
}

/// Flatten a tree into postorder
pub fn postorder(tree: &AccessTree) -> Vec<TreeNode> {
    let mut out = Vec::with_capacity(tree.leaf_count() * 2);
    flatten(tree, &mut out);
    out
}

fn flatten(tree: &AccessTree, out: &mut Vec<TreeNode>) {
    for child in tree.children() {
        flatten(child, out);
    }
    out.push(match tree {
        AccessTree::Leaf(attribute) => TreeNode::Leaf(attribute.clone()),
        AccessTree::And(children) => TreeNode::And {
            arity: children.len(),
        },
        AccessTree::Or(children) => TreeNode::Or {
            arity: children.len(),
        },
        AccessTree::Threshold {
            threshold,
            children,
        } => TreeNode::Threshold {
            threshold: *threshold,
            arity: children.len(),
        },
    });
}

/// Rebuild a tree from postorder without recursion
///
/// Only the shape is checked here: operand counts, a single root and the
/// depth bound. Gate arity rules are left to [`AccessTree::validate`].
pub fn rebuild(nodes: Vec<TreeNode>) -> Result<AccessTree> {
    let mut stack: Vec<(AccessTree, usize)> = Vec::new();
    for node in nodes {
        let arity = node.arity();
        let start = stack.len().checked_sub(arity).ok_or_else(|| {
            NacError::serialization(format!(
                "gate takes {arity} operands but only {} precede it",
                stack.len()
            ))
        })?;
        let operands = stack.split_off(start);
        let depth = 1 + operands.iter().map(|(_, depth)| *depth).max().unwrap_or(0);
        if depth > MAX_DEPTH {
            return Err(NacError::serialization(format!(
                "policy nesting exceeds {MAX_DEPTH} levels"
            )));
        }
        let children = operands.into_iter().map(|(child, _)| child).collect();
        let tree = match node {
            TreeNode::Leaf(attribute) => AccessTree::Leaf(attribute),
            TreeNode::And { .. } => AccessTree::And(children),
            TreeNode::Or { .. } => AccessTree::Or(children),
            TreeNode::Threshold { threshold, .. } => AccessTree::Threshold {
                threshold,
                children,
            },
        };
        stack.push((tree, depth));
    }

    match stack.pop() {
        Some((tree, _)) if stack.is_empty() => Ok(tree),
        Some(_) => Err(NacError::serialization(format!(
            "{} disconnected subtrees",
            stack.len() + 1
        ))),
        None => Err(NacError::serialization("empty access tree")),
    }
}

impl Serialize for AccessTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        postorder(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AccessTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let nodes = Vec::<TreeNode>::deserialize(deserializer)?;
        rebuild(nodes).map_err(de::Error::custom)
    }
}

fn options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_TREE_BYTES)
}

/// Encode a tree for transmission
pub fn to_bytes(tree: &AccessTree) -> Result<Vec<u8>> {
    let body = options().serialize(tree)?;
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(TREE_ENCODING_VERSION);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode and validate a transmitted tree
pub fn from_bytes(bytes: &[u8]) -> Result<AccessTree> {
    let (version, body) = bytes
        .split_first()
        .ok_or_else(|| NacError::serialization("empty access tree encoding"))?;
    if *version != TREE_ENCODING_VERSION {
        return Err(NacError::serialization(format!(
            "unsupported access tree encoding version {version}"
        )));
    }
    let tree: AccessTree = options().deserialize(body)?;
    tree.validate()?;
    Ok(tree)
}
