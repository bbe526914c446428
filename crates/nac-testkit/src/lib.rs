//! NAC Testkit: fixtures shared by the workspace's integration tests
//!
//! - [`identity`]: deterministic signing identities derived from their name
//! - [`init_tracing`]: one-time log setup honouring `RUST_LOG`
//! - [`Deployment`]: an in-memory network whose nodes' reactors are tracked
//!   and shut down together
//! - [`universe`] / [`abe_authority`] / [`seeded_rng`]: ABE inputs with
//!   reproducible randomness

pub mod deployment;
pub mod identities;
pub mod logging;

pub use deployment::Deployment;
pub use identities::{abe_authority, identity, name, seeded_rng, universe};
pub use logging::init_tracing;
pub use nac_core::ManualClock;
