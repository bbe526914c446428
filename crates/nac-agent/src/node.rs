//! A network participant: engine, authenticator, handlers and worker pool
//! wired to one face

use crate::auth::Authenticator;
use crate::engine::CommandEngine;
use crate::reactor::{Reactor, ReactorHandle};
use crate::router::{RequestHandler, Router};
use crate::transport::{Face, MemoryNetwork, Packet};
use crate::worker::CryptoWorker;
use nac_command::{Certificate, Signer, TrustStore};
use nac_core::{AgentConfig, Clock, Name, NacError, Result};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Shared plumbing every role agent is built on
#[derive(Debug)]
pub struct Node {
    engine: Arc<CommandEngine>,
    authenticator: Arc<Authenticator>,
    router: Arc<Router>,
    worker: CryptoWorker,
    inbound: Mutex<Option<mpsc::UnboundedReceiver<Packet>>>,
}

impl Node {
    /// Node sending through `face` and receiving from `inbound`
    pub fn new(
        face: Arc<dyn Face>,
        inbound: mpsc::UnboundedReceiver<Packet>,
        signer: Arc<dyn Signer>,
        clock: Arc<dyn Clock>,
        config: AgentConfig,
    ) -> Result<Self> {
        config.validate()?;
        let trust = Arc::new(RwLock::new(TrustStore::new()));
        let authenticator = Arc::new(Authenticator::new(
            trust.clone(),
            clock.clone(),
            config.freshness_window_ms,
        ));
        let worker = CryptoWorker::new(config.crypto_workers);
        let engine = Arc::new(CommandEngine::new(face, signer, trust, clock, config));
        Ok(Self {
            engine,
            authenticator,
            router: Arc::new(Router::new()),
            worker,
            inbound: Mutex::new(Some(inbound)),
        })
    }

    /// Node attached to an in-memory network
    pub fn attach(
        network: &MemoryNetwork,
        signer: Arc<dyn Signer>,
        clock: Arc<dyn Clock>,
        config: AgentConfig,
    ) -> Result<Self> {
        let (face, inbound) = network.connect();
        Self::new(Arc::new(face), inbound, signer, clock, config)
    }

    /// Identity this node signs as
    pub fn identity(&self) -> &Name {
        self.engine.signer().certificate().identity()
    }

    /// Certificate other nodes need to trust this one
    pub fn certificate(&self) -> Certificate {
        self.engine.signer().certificate().clone()
    }

    /// Trust `certificate` for commands and replies
    pub fn trust(&self, certificate: Certificate) {
        self.engine.add_trusted(certificate);
    }

    /// Serve commands under `prefix` with `handler`
    pub fn serve(&self, prefix: Name, handler: Arc<dyn RequestHandler>) -> Result<()> {
        self.engine.face().register_prefix(prefix.clone())?;
        tracing::debug!(node = %self.identity(), prefix = %prefix, "Serving prefix");
        self.router.register(prefix, handler);
        Ok(())
    }

    /// Spawn the reactor; a node can only be started once
    pub fn start(&self) -> Result<ReactorHandle> {
        let inbound = self
            .inbound
            .lock()
            .take()
            .ok_or_else(|| NacError::invalid(format!("node {} already started", self.identity())))?;
        Ok(Reactor::new(self.engine.clone(), self.router.clone(), inbound).spawn())
    }

    /// Command engine
    pub fn engine(&self) -> &Arc<CommandEngine> {
        &self.engine
    }

    /// Inbound command authenticator
    pub fn authenticator(&self) -> &Arc<Authenticator> {
        &self.authenticator
    }

    /// Blocking pool for ABE work
    pub fn worker(&self) -> &CryptoWorker {
        &self.worker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nac_command::Ed25519Identity;
    use nac_core::ManualClock;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[tokio::test]
    async fn test_node_starts_once() {
        let network = MemoryNetwork::new();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let identity = Ed25519Identity::generate(Name::from_uri("/owner").unwrap(), &mut rng);
        let node = Node::attach(
            &network,
            Arc::new(identity),
            Arc::new(ManualClock::new(0)),
            AgentConfig::testing(),
        )
        .unwrap();

        let reactor = node.start().unwrap();
        assert!(matches!(node.start(), Err(NacError::Invalid { .. })));
        reactor.shutdown().await;
    }

    #[test]
    fn test_invalid_config_rejected() {
        let network = MemoryNetwork::new();
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let identity = Ed25519Identity::generate(Name::from_uri("/owner").unwrap(), &mut rng);
        let config = AgentConfig {
            command_timeout_ms: 0,
            ..AgentConfig::testing()
        };
        let clock = Arc::new(ManualClock::new(0));
        let result = Node::attach(&network, Arc::new(identity), clock, config);
        assert!(matches!(result, Err(NacError::Config { .. })));
    }
}
