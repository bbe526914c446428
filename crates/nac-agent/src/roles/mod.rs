//! The four NAC roles, each a thin adapter over a [`crate::Node`]

pub mod authority;
pub mod consumer;
pub mod data_owner;
pub mod producer;

pub use authority::AttributeAuthority;
pub use consumer::Consumer;
pub use data_owner::DataOwner;
pub use producer::{PolicyBinding, Producer};
