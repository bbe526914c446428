//! Attribute Authority: publishes parameters and issues decryption keys

use crate::auth::Authenticator;
use crate::engine::CommandEngine;
use crate::node::Node;
use crate::router::RequestHandler;
use crate::worker::CryptoWorker;
use async_trait::async_trait;
use nac_abe::AbeAuthority;
use nac_command::{Certificate, CommandRequest, KeyRequest, Operation, ReplyContent};
use nac_core::{Name, NacError, Result};
use nac_policy::AttributeSet;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Serves `FETCH_PUBLIC_PARAMS` and `FETCH_KEY` under its prefix
#[derive(Debug)]
pub struct AttributeAuthority {
    prefix: Name,
    abe: Arc<AbeAuthority>,
    engine: Arc<CommandEngine>,
    authenticator: Arc<Authenticator>,
    worker: CryptoWorker,
    grants: RwLock<HashMap<Name, AttributeSet>>,
}

impl AttributeAuthority {
    /// Authority serving `prefix` on `node`
    pub fn attach(node: &Node, prefix: Name, abe: AbeAuthority) -> Result<Arc<Self>> {
        let authority = Arc::new(Self {
            prefix: prefix.clone(),
            abe: Arc::new(abe),
            engine: node.engine().clone(),
            authenticator: node.authenticator().clone(),
            worker: node.worker().clone(),
            grants: RwLock::new(HashMap::new()),
        });
        node.serve(prefix, authority.clone())?;
        Ok(authority)
    }

    /// Prefix this authority serves
    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    /// Underlying ABE authority
    pub fn abe(&self) -> &AbeAuthority {
        &self.abe
    }

    /// Entitle `consumer` to a key for `attributes`
    pub fn grant(&self, consumer: Certificate, attributes: AttributeSet) -> Result<()> {
        if let Some(unknown) = attributes
            .iter()
            .find(|attribute| !self.abe.public_params().contains(attribute))
        {
            return Err(NacError::unknown_attribute(unknown.as_str()));
        }
        tracing::info!(
            consumer = %consumer.identity(),
            attributes = attributes.len(),
            "Attributes granted"
        );
        self.grants.write().insert(consumer.identity().clone(), attributes);
        self.engine.add_trusted(consumer);
        Ok(())
    }

    /// Attributes granted to `identity`
    pub fn granted(&self, identity: &Name) -> Option<AttributeSet> {
        self.grants.read().get(identity).cloned()
    }

    async fn handle_fetch_key(&self, request: &CommandRequest) -> Result<ReplyContent> {
        let consumer = self.authenticator.authenticate(request)?;
        let identity = consumer.identity().clone();
        let attributes = self
            .granted(&identity)
            .ok_or_else(|| NacError::not_found(format!("no attributes granted to {identity}")))?;
        let key_request = KeyRequest::from_bytes(request.payload())?;

        let abe = self.abe.clone();
        let sealed = self
            .worker
            .run(move || {
                let mut rng = rand::thread_rng();
                let key = abe.keygen(&attributes, &mut rng)?;
                let key_bytes = zeroize::Zeroizing::new(key.to_bytes()?);
                key_request.seal(&key_bytes, &identity.encode(), &mut rng)?.to_bytes()
            })
            .await?;
        tracing::info!(consumer = %consumer.identity(), "Decryption key issued");
        Ok(ReplyContent::success(sealed))
    }
}

#[async_trait]
impl RequestHandler for AttributeAuthority {
    async fn handle(&self, request: CommandRequest) -> Result<ReplyContent> {
        match request.operation() {
            Operation::FetchPublicParams => {
                Ok(ReplyContent::success(self.abe.public_params().to_bytes()?))
            }
            Operation::FetchKey => self.handle_fetch_key(&request).await,
            other => Err(NacError::invalid(format!("authority does not serve {other}"))),
        }
    }
}
