//! NAC Agent: the asynchronous command protocol and the role agents built on it
//!
//! A [`Node`] is one network participant. It owns a [`CommandEngine`] that
//! signs commands and resolves each one exactly once (reply, timeout or
//! cancel), a [`Router`] that hands inbound commands to role handlers, a
//! [`CryptoWorker`] for ABE work and a [`Reactor`] task tying them to a
//! [`transport::Face`].
//!
//! ```no_run
//! # async fn demo() -> nac_core::Result<()> {
//! use nac_agent::{transport::MemoryNetwork, DataOwner, Node};
//! use nac_command::Ed25519Identity;
//! use nac_core::{AgentConfig, Name, SystemClock};
//! use std::sync::Arc;
//!
//! let network = MemoryNetwork::new();
//! let identity = Ed25519Identity::generate(Name::from_uri("/owner")?, &mut rand::thread_rng());
//! let node = Node::attach(
//!     &network,
//!     Arc::new(identity),
//!     Arc::new(SystemClock),
//!     AgentConfig::default(),
//! )?;
//! let _reactor = node.start()?;
//!
//! let owner = DataOwner::new(&node);
//! let result = owner
//!     .set_producer_policy_async(
//!         &Name::from_uri("/producer")?,
//!         &Name::from_uri("/dataset1/example")?,
//!         "attr1 and attr2 or attr3",
//!     )
//!     .await;
//! # let _ = result;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod content;
pub mod engine;
pub mod failure;
pub mod node;
pub mod pending;
pub mod reactor;
pub mod roles;
pub mod router;
pub mod transport;
pub mod worker;

pub use auth::Authenticator;
pub use content::EncryptedContent;
pub use engine::{CommandEngine, CommandResult};
pub use failure::CommandFailure;
pub use node::Node;
pub use pending::{CorrelationKey, FailureCallback, PendingOperation, PendingTable, SuccessCallback};
pub use reactor::{Reactor, ReactorHandle};
pub use roles::{AttributeAuthority, Consumer, DataOwner, PolicyBinding, Producer};
pub use router::{RequestHandler, Router};
pub use worker::CryptoWorker;
