//! NAC Policy: the access-tree policy engine
//!
//! Pure and stateless. Policy text is parsed into an [`AccessTree`], evaluated
//! against an [`AttributeSet`], and encoded into bytes for embedding in
//! ciphertexts.
//!
//! ```
//! use nac_policy::{attribute_set, evaluate, parse};
//!
//! let tree = parse("attr1 and attr2 or attr3").unwrap();
//! assert!(evaluate(&tree, &attribute_set(["attr3"]).unwrap()));
//! assert!(!evaluate(&tree, &attribute_set(["attr1"]).unwrap()));
//! ```

pub mod attribute;
pub mod codec;
pub mod evaluate;
pub mod parser;
pub mod tree;

pub use attribute::{attribute_set, Attribute, AttributeSet};
pub use codec::{from_bytes, to_bytes, TreeNode};
pub use evaluate::{evaluate, satisfying_selection, SelectedChild, Selection};
pub use parser::parse;
pub use tree::AccessTree;
