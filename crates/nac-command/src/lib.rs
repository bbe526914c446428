//! NAC Command: the signed command protocol
//!
//! Commands are hierarchical names whose last component carries an Ed25519
//! signature over everything before it. Replies echo the command name and are
//! signed by the node that handled the command, so a requester can check that
//! the answer came from the node it addressed before trusting the outcome.
//!
//! - [`build_request`] / [`parse_request`]: command names
//! - [`build_reply`] / [`parse_reply`]: signed replies and [`Outcome`]s
//! - [`Signer`], [`Certificate`], [`TrustStore`]: the identity collaborator
//! - [`ReplayGuard`]: per-signer timestamp freshness
//! - [`KeyRequest`] / [`SealedKey`]: confidential key delivery

pub mod identity;
pub mod key_delivery;
pub mod operation;
pub mod replay;
pub mod reply;
pub mod request;
pub mod signature;

pub use identity::{Certificate, Ed25519Identity, Signer, TrustStore};
pub use key_delivery::{KeyRequest, KeyRequestSecret, SealedKey};
pub use operation::Operation;
pub use replay::ReplayGuard;
pub use reply::{
    build_raw_reply, build_reply, expect_success, parse_reply, Outcome, Reply, ReplyContent,
    ReplyStatus,
};
pub use request::{build_request, parse_request, CommandRequest};
pub use signature::SignatureInfo;
