//! Named-network transport boundary
//!
//! The engine only needs to push packets out and learn about packets coming
//! in. A [`Face`] is the outbound half; the inbound half is an unbounded mpsc
//! receiver handed to the [`crate::Reactor`].

pub mod memory;

use nac_command::Reply;
use nac_core::{Name, Result};
use std::fmt;

pub use memory::{MemoryFace, MemoryNetwork};

/// A packet on the named network
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// A command; the whole command travels in its name
    Request(Name),
    /// A signed reply, routed back along the request's path
    Reply(Reply),
}

impl Packet {
    /// Name the packet is routed by
    pub fn name(&self) -> &Name {
        match self {
            Packet::Request(name) => name,
            Packet::Reply(reply) => reply.name(),
        }
    }
}

/// Outbound side of a network attachment
pub trait Face: Send + Sync + fmt::Debug {
    /// Hand a packet to the network; never waits for delivery
    fn send(&self, packet: Packet) -> Result<()>;

    /// Ask the network to deliver requests under `prefix` to this face
    fn register_prefix(&self, prefix: Name) -> Result<()>;

    /// Stop waiting for a reply to the request `name`
    fn withdraw(&self, name: &Name);
}
