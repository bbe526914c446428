//! In-memory forwarder
//!
//! Every attached face gets an unbounded channel. Requests go to the face with
//! the longest registered prefix matching the name (never back to the sender);
//! the forwarder remembers where each request came from so the reply can be
//! sent back. That memory lasts until the reply passes, the requester
//! withdraws, or the requester's face closes. Unroutable packets are dropped,
//! as a real network would.

use super::{Face, Packet};
use nac_core::{Name, NacError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

type FaceId = u64;

#[derive(Debug)]
struct FaceEntry {
    tx: mpsc::UnboundedSender<Packet>,
    prefixes: Vec<Name>,
}

#[derive(Debug, Default)]
struct Forwarder {
    faces: HashMap<FaceId, FaceEntry>,
    /// Request name -> face the request arrived from
    pending_interests: HashMap<Name, FaceId>,
    next_id: FaceId,
}

impl Forwarder {
    fn route_request(&self, name: &Name, origin: FaceId) -> Option<FaceId> {
        self.faces
            .iter()
            .filter(|(id, _)| **id != origin)
            .filter_map(|(id, entry)| {
                entry
                    .prefixes
                    .iter()
                    .filter(|prefix| prefix.is_prefix_of(name))
                    .map(Name::len)
                    .max()
                    .map(|len| (len, *id))
            })
            .max()
            .map(|(_, id)| id)
    }

    fn detach(&mut self, id: FaceId) {
        self.faces.remove(&id);
        self.pending_interests.retain(|_, origin| *origin != id);
        tracing::debug!(face = id, "Face detached from memory network");
    }
}

/// Shared in-memory network
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    forwarder: Arc<RwLock<Forwarder>>,
}

impl MemoryNetwork {
    /// Empty network
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new face; packets for it arrive on the returned receiver
    pub fn connect(&self) -> (MemoryFace, mpsc::UnboundedReceiver<Packet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut forwarder = self.forwarder.write();
        let id = forwarder.next_id;
        forwarder.next_id += 1;
        forwarder.faces.insert(
            id,
            FaceEntry {
                tx,
                prefixes: Vec::new(),
            },
        );
        tracing::debug!(face = id, "Face attached to memory network");
        (
            MemoryFace {
                id,
                network: self.clone(),
            },
            rx,
        )
    }

    /// Number of requests still waiting for a reply
    pub fn pending_interests(&self) -> usize {
        self.forwarder.read().pending_interests.len()
    }

    fn forward(&self, origin: FaceId, packet: Packet) -> Result<()> {
        let mut forwarder = self.forwarder.write();
        let (destination, interest) = match &packet {
            Packet::Request(name) => {
                let Some(destination) = forwarder.route_request(name, origin) else {
                    tracing::debug!(name = %name, "No route for request, dropping");
                    return Ok(());
                };
                (destination, Some(name.clone()))
            }
            Packet::Reply(reply) => {
                let Some(destination) = forwarder.pending_interests.remove(reply.name()) else {
                    tracing::debug!(name = %reply.name(), "Reply matches no pending request");
                    return Ok(());
                };
                (destination, None)
            }
        };

        let entry = forwarder
            .faces
            .get(&destination)
            .ok_or_else(|| NacError::transport(format!("face {destination} detached")))?;
        if entry.tx.send(packet).is_err() {
            forwarder.detach(destination);
            return Err(NacError::transport(format!("face {destination} closed")));
        }
        if let Some(name) = interest {
            forwarder.pending_interests.insert(name, origin);
        }
        Ok(())
    }
}

/// A node's attachment to a [`MemoryNetwork`]
#[derive(Debug, Clone)]
pub struct MemoryFace {
    id: FaceId,
    network: MemoryNetwork,
}

impl Face for MemoryFace {
    fn send(&self, packet: Packet) -> Result<()> {
        self.network.forward(self.id, packet)
    }

    fn register_prefix(&self, prefix: Name) -> Result<()> {
        let mut forwarder = self.network.forwarder.write();
        let entry = forwarder
            .faces
            .get_mut(&self.id)
            .ok_or_else(|| NacError::transport("face detached"))?;
        tracing::debug!(face = self.id, prefix = %prefix, "Prefix registered");
        entry.prefixes.push(prefix);
        Ok(())
    }

    fn withdraw(&self, name: &Name) {
        let mut forwarder = self.network.forwarder.write();
        if forwarder.pending_interests.get(name) == Some(&self.id) {
            forwarder.pending_interests.remove(name);
            tracing::trace!(face = self.id, name = %name, "Interest withdrawn");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nac_command::{build_raw_reply, Ed25519Identity};
    use nac_core::ManualClock;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[test]
    fn test_request_reaches_longest_prefix() {
        let network = MemoryNetwork::new();
        let (client, _client_rx) = network.connect();
        let (broad, mut broad_rx) = network.connect();
        let (narrow, mut narrow_rx) = network.connect();
        broad.register_prefix(name("/producer")).unwrap();
        narrow.register_prefix(name("/producer/lab")).unwrap();

        client.send(Packet::Request(name("/producer/lab/x"))).unwrap();
        assert_eq!(
            narrow_rx.try_recv().unwrap(),
            Packet::Request(name("/producer/lab/x"))
        );
        assert!(broad_rx.try_recv().is_err());

        client.send(Packet::Request(name("/producer/other"))).unwrap();
        assert_eq!(
            broad_rx.try_recv().unwrap(),
            Packet::Request(name("/producer/other"))
        );
    }

    #[test]
    fn test_reply_returns_to_origin_once() {
        let network = MemoryNetwork::new();
        let (client, mut client_rx) = network.connect();
        let (server, mut server_rx) = network.connect();
        server.register_prefix(name("/producer")).unwrap();

        client.send(Packet::Request(name("/producer/x"))).unwrap();
        assert!(server_rx.try_recv().is_ok());
        assert_eq!(network.pending_interests(), 1);

        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let identity = Ed25519Identity::generate(name("/producer"), &mut rng);
        let reply = build_raw_reply(
            &name("/producer/x"),
            b"success".to_vec(),
            &identity,
            &ManualClock::new(0),
        );
        server.send(Packet::Reply(reply.clone())).unwrap();
        server.send(Packet::Reply(reply.clone())).unwrap();

        assert_eq!(client_rx.try_recv().unwrap(), Packet::Reply(reply));
        assert!(client_rx.try_recv().is_err());
        assert_eq!(network.pending_interests(), 0);
    }

    #[test]
    fn test_requests_never_loop_back() {
        let network = MemoryNetwork::new();
        let (node, mut node_rx) = network.connect();
        node.register_prefix(name("/producer")).unwrap();
        node.send(Packet::Request(name("/producer/x"))).unwrap();
        assert!(node_rx.try_recv().is_err());
        assert_eq!(network.pending_interests(), 0);
    }

    #[test]
    fn test_withdrawn_interest_is_forgotten() {
        let network = MemoryNetwork::new();
        let (client, mut client_rx) = network.connect();
        let (server, mut server_rx) = network.connect();
        server.register_prefix(name("/producer")).unwrap();

        client.send(Packet::Request(name("/producer/x"))).unwrap();
        assert!(server_rx.try_recv().is_ok());

        server.withdraw(&name("/producer/x"));
        assert_eq!(network.pending_interests(), 1);
        client.withdraw(&name("/producer/x"));
        assert_eq!(network.pending_interests(), 0);

        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let identity = Ed25519Identity::generate(name("/producer"), &mut rng);
        let reply = build_raw_reply(
            &name("/producer/x"),
            b"success".to_vec(),
            &identity,
            &ManualClock::new(0),
        );
        server.send(Packet::Reply(reply)).unwrap();
        assert!(client_rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_face_releases_its_interests() {
        let network = MemoryNetwork::new();
        let (relay, relay_rx) = network.connect();
        let (producer, _producer_rx) = network.connect();
        let (client, _client_rx) = network.connect();
        relay.register_prefix(name("/relay")).unwrap();
        producer.register_prefix(name("/producer")).unwrap();

        relay.send(Packet::Request(name("/producer/x"))).unwrap();
        assert_eq!(network.pending_interests(), 1);

        drop(relay_rx);
        assert!(client.send(Packet::Request(name("/relay/y"))).is_err());
        assert_eq!(network.pending_interests(), 0);
    }

    #[test]
    fn test_undeliverable_request_leaves_no_interest() {
        let network = MemoryNetwork::new();
        let (client, _client_rx) = network.connect();
        let (server, server_rx) = network.connect();
        server.register_prefix(name("/producer")).unwrap();
        drop(server_rx);

        assert!(client.send(Packet::Request(name("/producer/x"))).is_err());
        assert_eq!(network.pending_interests(), 0);
    }
}
