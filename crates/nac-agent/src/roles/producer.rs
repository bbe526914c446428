//! Producer: holds policy bindings and publishes encrypted content

use crate::auth::Authenticator;
use crate::content::EncryptedContent;
use crate::engine::CommandEngine;
use crate::node::Node;
use crate::router::RequestHandler;
use crate::worker::CryptoWorker;
use async_trait::async_trait;
use nac_abe::PublicParams;
use nac_command::{Certificate, CommandRequest, Operation, ReplyContent};
use nac_core::{Name, NacError, Result};
use nac_policy::AccessTree;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Policy a Data Owner bound to a data prefix
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyBinding {
    /// Producer holding the binding
    pub producer_prefix: Name,
    /// Data the policy protects
    pub data_prefix: Name,
    /// Policy as submitted
    pub policy_text: String,
    /// Parsed policy
    pub tree: AccessTree,
}

/// Serves `SET_POLICY` and `FETCH_CONTENT` under its prefix
#[derive(Debug)]
pub struct Producer {
    prefix: Name,
    engine: Arc<CommandEngine>,
    authenticator: Arc<Authenticator>,
    worker: CryptoWorker,
    owners: RwLock<HashMap<Name, Name>>,
    bindings: RwLock<HashMap<Name, PolicyBinding>>,
    public_params: RwLock<Option<Arc<PublicParams>>>,
    content: RwLock<HashMap<Name, Arc<Vec<u8>>>>,
}

impl Producer {
    /// Producer serving `prefix` on `node`
    pub fn attach(node: &Node, prefix: Name) -> Result<Arc<Self>> {
        let producer = Arc::new(Self {
            prefix: prefix.clone(),
            engine: node.engine().clone(),
            authenticator: node.authenticator().clone(),
            worker: node.worker().clone(),
            owners: RwLock::new(HashMap::new()),
            bindings: RwLock::new(HashMap::new()),
            public_params: RwLock::new(None),
            content: RwLock::new(HashMap::new()),
        });
        node.serve(prefix, producer.clone())?;
        Ok(producer)
    }

    /// Prefix this producer serves
    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    /// Allow `owner` to set policies for `data_prefix` and everything under it
    pub fn register_owner(&self, data_prefix: Name, owner: Certificate) {
        tracing::debug!(data_prefix = %data_prefix, owner = %owner.identity(), "Owner registered");
        self.owners.write().insert(data_prefix, owner.identity().clone());
        self.engine.add_trusted(owner);
    }

    /// Binding that governs `name`, by longest data prefix
    pub fn policy_for(&self, name: &Name) -> Option<PolicyBinding> {
        self.bindings
            .read()
            .values()
            .filter(|binding| binding.data_prefix.is_prefix_of(name))
            .max_by_key(|binding| binding.data_prefix.len())
            .cloned()
    }

    /// Fetch and cache the authority's public parameters
    pub async fn fetch_public_params(&self, authority: &Name) -> Result<()> {
        let body = self
            .engine
            .request(authority, Operation::FetchPublicParams, &Name::new(), Vec::new())
            .await?;
        let public = PublicParams::from_bytes(&body)?;
        tracing::info!(
            authority = %authority,
            params = %public.id(),
            "Public parameters installed"
        );
        *self.public_params.write() = Some(Arc::new(public));
        Ok(())
    }

    /// Encrypt `plaintext` under the policy bound to `data_prefix` and
    /// publish it as `data_prefix/suffix`; returns the content name
    pub async fn produce(
        &self,
        data_prefix: &Name,
        suffix: &Name,
        plaintext: Vec<u8>,
    ) -> Result<Name> {
        let public = self
            .public_params
            .read()
            .clone()
            .ok_or_else(|| NacError::not_found("public parameters not fetched"))?;
        let name = data_prefix.clone().append_name(suffix);
        let binding = self
            .policy_for(&name)
            .ok_or_else(|| NacError::not_found(format!("no policy bound for {data_prefix}")))?;

        let content_name = name.clone();
        let envelope = self
            .worker
            .run(move || {
                let mut rng = rand::thread_rng();
                EncryptedContent::seal(&public, &binding.tree, content_name, &plaintext, &mut rng)?
                    .to_bytes()
            })
            .await?;
        tracing::debug!(name = %name, bytes = envelope.len(), "Content published");
        self.content.write().insert(name.clone(), Arc::new(envelope));
        Ok(name)
    }

    fn handle_set_policy(&self, request: &CommandRequest) -> Result<ReplyContent> {
        let owner = self.authenticator.authenticate(request)?;
        let data_prefix = request.data_prefix();
        self.check_owner(data_prefix, owner.identity())?;

        let policy_text = request.payload_text()?;
        let tree = nac_policy::parse(policy_text)?;

        let mut bindings = self.bindings.write();
        if let Some(existing) = bindings.get(data_prefix) {
            if existing.tree == tree {
                tracing::debug!(data_prefix = %data_prefix, "Policy already bound");
                return Ok(ReplyContent::already_exists());
            }
        }
        tracing::info!(
            data_prefix = %data_prefix,
            owner = %owner.identity(),
            policy = policy_text,
            "Policy bound"
        );
        bindings.insert(
            data_prefix.clone(),
            PolicyBinding {
                producer_prefix: self.prefix.clone(),
                data_prefix: data_prefix.clone(),
                policy_text: policy_text.to_string(),
                tree,
            },
        );
        Ok(ReplyContent::success(Vec::new()))
    }

    fn handle_fetch_content(&self, request: &CommandRequest) -> Result<ReplyContent> {
        let name = request.data_prefix();
        let envelope = self
            .content
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| NacError::not_found(format!("no content named {name}")))?;
        Ok(ReplyContent::success(envelope.as_ref().clone()))
    }

    fn check_owner(&self, data_prefix: &Name, signer: &Name) -> Result<()> {
        let owners = self.owners.read();
        let owner = owners
            .iter()
            .filter(|(prefix, _)| prefix.is_prefix_of(data_prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, owner)| owner);
        match owner {
            Some(owner) if owner == signer => Ok(()),
            _ => Err(NacError::invalid(format!("{signer} does not own {data_prefix}"))),
        }
    }
}

#[async_trait]
impl RequestHandler for Producer {
    async fn handle(&self, request: CommandRequest) -> Result<ReplyContent> {
        match request.operation() {
            Operation::SetPolicy => self.handle_set_policy(&request),
            Operation::FetchContent => self.handle_fetch_content(&request),
            other => Err(NacError::invalid(format!("producer does not serve {other}"))),
        }
    }
}
