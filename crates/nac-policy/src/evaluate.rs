//! Satisfiability and minimal satisfying selections

use crate::attribute::AttributeSet;
use crate::tree::AccessTree;

/// Whether `attributes` satisfies `tree`
pub fn evaluate(tree: &AccessTree, attributes: &AttributeSet) -> bool {
    match tree {
        AccessTree::Leaf(attribute) => attributes.contains(attribute),
        AccessTree::And(children) => children.iter().all(|c| evaluate(c, attributes)),
        AccessTree::Or(children) => children.iter().any(|c| evaluate(c, attributes)),
        AccessTree::Threshold {
            threshold,
            children,
        } => {
            children
                .iter()
                .filter(|c| evaluate(c, attributes))
                .take(*threshold)
                .count()
                == *threshold
        }
    }
}

/// The part of a tree a decryptor actually uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A satisfied leaf, identified by its depth-first position
    Leaf {
        /// Index into the tree's depth-first leaf order
        ordinal: usize,
    },
    /// Exactly `required()` satisfied children of an internal node
    Node {
        /// Chosen children in ascending index order
        children: Vec<SelectedChild>,
    },
}

/// One chosen child of an internal node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedChild {
    /// 1-based child position; this is the secret-sharing evaluation point
    pub index: usize,
    /// How the child itself is satisfied
    pub selection: Selection,
}

impl Selection {
    /// Depth-first ordinals of every leaf the selection touches
    pub fn leaf_ordinals(&self) -> Vec<usize> {
        match self {
            Selection::Leaf { ordinal } => vec![*ordinal],
            Selection::Node { children } => children
                .iter()
                .flat_map(|child| child.selection.leaf_ordinals())
                .collect(),
        }
    }
}

/// A minimal satisfying selection, or `None` when the set does not satisfy the tree.
///
/// Internal nodes pick exactly as many children as they require, preferring the
/// children that need the fewest leaves, so decryption does the least pairing
/// work available.
pub fn satisfying_selection(tree: &AccessTree, attributes: &AttributeSet) -> Option<Selection> {
    select(tree, attributes, 0).map(|(selection, _)| selection)
}

fn select(
    tree: &AccessTree,
    attributes: &AttributeSet,
    offset: usize,
) -> Option<(Selection, usize)> {
    if let AccessTree::Leaf(attribute) = tree {
        return attributes
            .contains(attribute)
            .then_some((Selection::Leaf { ordinal: offset }, 1));
    }

    let mut candidates = Vec::new();
    let mut child_offset = offset;
    for (i, child) in tree.children().iter().enumerate() {
        if let Some((selection, cost)) = select(child, attributes, child_offset) {
            candidates.push((i + 1, selection, cost));
        }
        child_offset += child.leaf_count();
    }

    let required = tree.required();
    if candidates.len() < required {
        return None;
    }

    candidates.sort_by_key(|(_, _, cost)| *cost);
    candidates.truncate(required);
    candidates.sort_by_key(|(index, _, _)| *index);

    let total = candidates.iter().map(|(_, _, cost)| cost).sum();
    let children = candidates
        .into_iter()
        .map(|(index, selection, _)| SelectedChild { index, selection })
        .collect();
    Some((Selection::Node { children }, total))
}
