//! Consumer: obtains a decryption key and reads protected content

use crate::content::EncryptedContent;
use crate::engine::CommandEngine;
use crate::node::Node;
use crate::worker::CryptoWorker;
use nac_abe::{DecryptionKey, PublicParams};
use nac_command::{KeyRequest, Operation, SealedKey};
use nac_core::{Name, NacError, Result};
use nac_policy::AttributeSet;
use parking_lot::RwLock;
use std::sync::Arc;

/// Fetches keys from an authority and content from producers
#[derive(Debug)]
pub struct Consumer {
    engine: Arc<CommandEngine>,
    worker: CryptoWorker,
    public_params: RwLock<Option<Arc<PublicParams>>>,
    key: RwLock<Option<Arc<DecryptionKey>>>,
}

impl Consumer {
    /// Consumer acting through `node`
    pub fn new(node: &Node) -> Self {
        Self {
            engine: node.engine().clone(),
            worker: node.worker().clone(),
            public_params: RwLock::new(None),
            key: RwLock::new(None),
        }
    }

    /// Fetch and cache the authority's public parameters
    pub async fn fetch_public_params(&self, authority: &Name) -> Result<()> {
        let body = self
            .engine
            .request(authority, Operation::FetchPublicParams, &Name::new(), Vec::new())
            .await?;
        let public = PublicParams::from_bytes(&body)?;
        *self.public_params.write() = Some(Arc::new(public));
        Ok(())
    }

    /// Fetch, unseal and install this consumer's decryption key; returns the
    /// attributes it carries
    pub async fn fetch_decryption_key(&self, authority: &Name) -> Result<AttributeSet> {
        let (key_request, secret) = KeyRequest::generate(&mut rand::thread_rng());
        let body = self
            .engine
            .request(authority, Operation::FetchKey, &Name::new(), key_request.to_bytes()?)
            .await?;

        let identity = self.engine.signer().certificate().identity().encode();
        let sealed = SealedKey::from_bytes(&body)?;
        let key_bytes = zeroize::Zeroizing::new(secret.open(&sealed, &identity)?);
        let key = DecryptionKey::from_bytes(&key_bytes)?;
        if let Some(public) = self.public_params.read().as_ref() {
            if public.id() != key.params_id() {
                return Err(NacError::invalid(format!(
                    "key issued under {} but cached parameters are {}",
                    key.params_id(),
                    public.id()
                )));
            }
        }

        let attributes = key.attributes();
        tracing::info!(
            authority = %authority,
            attributes = attributes.len(),
            "Decryption key installed"
        );
        *self.key.write() = Some(Arc::new(key));
        Ok(attributes)
    }

    /// Fetch `content_name` from `producer` and decrypt it
    ///
    /// `PolicyNotSatisfied` if the installed key's attributes do not satisfy
    /// the content's policy.
    pub async fn consume(&self, producer: &Name, content_name: &Name) -> Result<Vec<u8>> {
        let key = self
            .key
            .read()
            .clone()
            .ok_or_else(|| NacError::not_found("no decryption key installed"))?;
        let body = self
            .engine
            .request(producer, Operation::FetchContent, content_name, Vec::new())
            .await?;
        let content = EncryptedContent::from_bytes(&body)?;
        if content.name() != content_name {
            return Err(NacError::malformed_ciphertext(format!(
                "asked for {content_name}, received {}",
                content.name()
            )));
        }

        let plaintext = self.worker.run(move || content.open(&key)).await;
        match &plaintext {
            Ok(bytes) => {
                tracing::debug!(name = %content_name, bytes = bytes.len(), "Content decrypted")
            }
            Err(err) => {
                tracing::debug!(name = %content_name, error = %err, "Content not decrypted")
            }
        }
        plaintext
    }

    /// Whether a decryption key is installed
    pub fn has_key(&self) -> bool {
        self.key.read().is_some()
    }
}
