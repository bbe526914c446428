//! NAC Core: shared vocabulary for named-data attribute-based access control
//!
//! Every other crate in the workspace builds on the types here:
//!
//! - **Names**: structural, component-wise hierarchical names ([`Name`])
//! - **Errors**: the unified [`NacError`] taxonomy and [`Result`] alias
//! - **Time**: the injectable [`Clock`] used for deadlines and command timestamps
//! - **Configuration**: TOML-backed [`NacConfig`] with validation
//! - **Hashing**: the workspace digest helpers

pub mod config;
pub mod errors;
pub mod hash;
pub mod name;
pub mod time;

pub use config::{AgentConfig, AuthorityConfig, NacConfig, RetryPolicy};
pub use errors::{NacError, Result};
pub use name::{Component, Name};
pub use time::{Clock, ManualClock, SystemClock};
