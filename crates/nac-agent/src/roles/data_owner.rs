//! Data Owner: decides which policy protects each data prefix

use crate::engine::CommandEngine;
use crate::failure::CommandFailure;
use crate::node::Node;
use crate::pending::CorrelationKey;
use nac_command::Operation;
use nac_core::{Name, Result};
use std::sync::Arc;

/// Sends `SET_POLICY` commands to Producers
#[derive(Debug, Clone)]
pub struct DataOwner {
    engine: Arc<CommandEngine>,
}

impl DataOwner {
    /// Data Owner acting through `node`
    pub fn new(node: &Node) -> Self {
        Self {
            engine: node.engine().clone(),
        }
    }

    /// Ask `producer_prefix` to protect `data_prefix` with `policy_text`
    ///
    /// The policy is parsed locally first, so a syntax error is returned
    /// before anything is sent. Otherwise returns once the command is on the
    /// network; exactly one continuation runs later. `on_success` receives
    /// the command name echoed by the reply. A duplicate submission arrives
    /// as [`CommandFailure::AlreadyExists`].
    pub fn set_producer_policy<S, F>(
        &self,
        producer_prefix: &Name,
        data_prefix: &Name,
        policy_text: &str,
        on_success: S,
        on_failure: F,
    ) -> Result<CorrelationKey>
    where
        S: FnOnce(Name) + Send + 'static,
        F: FnOnce(CommandFailure) + Send + 'static,
    {
        nac_policy::parse(policy_text)?;
        let key = self.engine.send_command(
            producer_prefix,
            Operation::SetPolicy,
            data_prefix,
            policy_text,
            Box::new(move |name, _| on_success(name)),
            Box::new(on_failure),
        )?;
        tracing::info!(
            producer = %producer_prefix,
            data_prefix = %data_prefix,
            policy = policy_text,
            "Policy submitted"
        );
        Ok(key)
    }

    /// Awaitable [`DataOwner::set_producer_policy`]
    pub async fn set_producer_policy_async(
        &self,
        producer_prefix: &Name,
        data_prefix: &Name,
        policy_text: &str,
    ) -> std::result::Result<(), CommandFailure> {
        nac_policy::parse(policy_text)?;
        self.engine
            .request(producer_prefix, Operation::SetPolicy, data_prefix, policy_text)
            .await
            .map(|_| ())
    }

    /// Stop waiting for a submitted policy
    pub fn cancel(&self, key: &CorrelationKey) -> bool {
        self.engine.cancel(key)
    }
}
