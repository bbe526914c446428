//! Access trees
//!
//! The access tree is both the satisfiability structure tested during
//! decryption and the secret-sharing structure walked during encryption. AND and
//! OR are kept as their own variants for readability, but every internal node
//! exposes a single `required()` count so the sharing code treats them as
//! n-of-n and 1-of-n threshold gates.

use crate::attribute::{Attribute, AttributeSet};
use nac_core::{NacError, Result};
use std::fmt;

/// Maximum nesting accepted from text or bytes
pub const MAX_DEPTH: usize = 64;

/// A boolean combinator tree over attributes
///
/// Serializes as the flat postorder form in [`crate::codec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessTree {
    /// Satisfied iff the attribute is held
    Leaf(Attribute),
    /// Satisfied iff every child is
    And(Vec<AccessTree>),
    /// Satisfied iff at least one child is
    Or(Vec<AccessTree>),
    /// Satisfied iff at least `threshold` children are
    Threshold {
        /// Number of children that must be satisfied
        threshold: usize,
        /// Ordered children; order fixes share indices
        children: Vec<AccessTree>,
    },
}

impl AccessTree {
    /// Leaf node
    pub fn leaf(attribute: Attribute) -> Self {
        Self::Leaf(attribute)
    }

    /// AND node; needs at least two children
    pub fn and(children: Vec<AccessTree>) -> Result<Self> {
        let tree = Self::And(children);
        tree.check_node()?;
        Ok(tree)
    }

    /// OR node; needs at least two children
    pub fn or(children: Vec<AccessTree>) -> Result<Self> {
        let tree = Self::Or(children);
        tree.check_node()?;
        Ok(tree)
    }

    /// `threshold`-of-n node
    pub fn threshold(threshold: usize, children: Vec<AccessTree>) -> Result<Self> {
        let tree = Self::Threshold {
            threshold,
            children,
        };
        tree.check_node()?;
        Ok(tree)
    }

    /// Number of children that must be satisfied (1 for a leaf)
    pub fn required(&self) -> usize {
        match self {
            Self::Leaf(_) | Self::Or(_) => 1,
            Self::And(children) => children.len(),
            Self::Threshold { threshold, .. } => *threshold,
        }
    }

    /// Ordered children; empty for a leaf
    pub fn children(&self) -> &[AccessTree] {
        match self {
            Self::Leaf(_) => &[],
            Self::And(children) | Self::Or(children) => children,
            Self::Threshold { children, .. } => children,
        }
    }

    /// Whether this node is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Leaf attributes in depth-first order, duplicates included
    pub fn leaves(&self) -> Vec<&Attribute> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Attribute>) {
        match self {
            Self::Leaf(attribute) => out.push(attribute),
            _ => {
                for child in self.children() {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// Number of leaves (one per share in a ciphertext)
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            _ => self.children().iter().map(AccessTree::leaf_count).sum(),
        }
    }

    /// Distinct attributes mentioned anywhere in the tree
    pub fn attributes(&self) -> AttributeSet {
        self.leaves().into_iter().cloned().collect()
    }

    /// Height of the tree; a lone leaf has depth 1
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(AccessTree::depth)
            .max()
            .unwrap_or(0)
    }

    /// Check the structural invariants of the whole tree
    pub fn validate(&self) -> Result<()> {
        if self.depth() > MAX_DEPTH {
            return Err(NacError::policy_syntax(format!(
                "policy nesting exceeds {MAX_DEPTH} levels"
            )));
        }
        self.validate_nodes()
    }

    fn validate_nodes(&self) -> Result<()> {
        self.check_node()?;
        self.children()
            .iter()
            .try_for_each(AccessTree::validate_nodes)
    }

    fn check_node(&self) -> Result<()> {
        match self {
            Self::Leaf(_) => Ok(()),
            Self::And(children) | Self::Or(children) if children.len() < 2 => {
                Err(NacError::policy_syntax(format!(
                    "{} needs at least two operands",
                    self.connective()
                )))
            }
            Self::Threshold {
                threshold,
                children,
            } => {
                if children.len() < 2 {
                    return Err(NacError::policy_syntax(
                        "threshold gate needs at least two operands",
                    ));
                }
                if *threshold == 0 || *threshold > children.len() {
                    return Err(NacError::policy_syntax(format!(
                        "threshold {threshold} out of range for {} operands",
                        children.len()
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn connective(&self) -> &'static str {
        match self {
            Self::Leaf(_) => "leaf",
            Self::And(_) => "and",
            Self::Or(_) => "or",
            Self::Threshold { .. } => "of",
        }
    }
}

impl fmt::Display for AccessTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn operand(child: &AccessTree, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            if child.is_leaf() {
                write!(f, "{child}")
            } else {
                write!(f, "({child})")
            }
        }

        match self {
            Self::Leaf(attribute) => write!(f, "{attribute}"),
            Self::And(children) | Self::Or(children) => {
                let separator = if matches!(self, Self::And(_)) {
                    " and "
                } else {
                    " or "
                };
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(separator)?;
                    }
                    operand(child, f)?;
                }
                Ok(())
            }
            Self::Threshold {
                threshold,
                children,
            } => {
                write!(f, "{threshold} of (")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
        }
    }
}
