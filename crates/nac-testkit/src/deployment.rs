//! In-memory deployments

use crate::identities::identity;
use nac_agent::transport::MemoryNetwork;
use nac_agent::{Node, ReactorHandle};
use nac_core::{AgentConfig, Clock, Result, SystemClock};
use std::sync::Arc;

/// Nodes sharing one [`MemoryNetwork`], each with a running reactor
///
/// Deadlines are driven by the reactors' tick, so deployments use the system
/// clock.
#[derive(Debug)]
pub struct Deployment {
    network: MemoryNetwork,
    clock: Arc<dyn Clock>,
    config: AgentConfig,
    reactors: Vec<ReactorHandle>,
}

impl Deployment {
    /// Empty deployment with `config` for every node
    pub fn new(config: AgentConfig) -> Self {
        Self {
            network: MemoryNetwork::new(),
            clock: Arc::new(SystemClock),
            config,
            reactors: Vec::new(),
        }
    }

    /// Deployment using [`AgentConfig::testing`]
    pub fn testing() -> Self {
        Self::new(AgentConfig::testing())
    }

    /// Attach and start a node signing as the deterministic identity for `uri`
    pub fn spawn(&mut self, uri: &str) -> Result<Node> {
        let node = Node::attach(
            &self.network,
            Arc::new(identity(uri)),
            self.clock.clone(),
            self.config.clone(),
        )?;
        self.reactors.push(node.start()?);
        Ok(node)
    }

    /// Make every node in `nodes` trust every other one
    pub fn trust_all(nodes: &[&Node]) {
        for node in nodes {
            for other in nodes {
                if node.identity() != other.identity() {
                    node.trust(other.certificate());
                }
            }
        }
    }

    /// Shared network
    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }

    /// Stop every reactor
    pub async fn shutdown(self) {
        for reactor in self.reactors {
            reactor.shutdown().await;
        }
    }
}
