//! Command engine shared by every role
//!
//! The engine signs and sends commands, tracks them in the [`PendingTable`]
//! and resolves each one exactly once: from a verified reply
//! ([`CommandEngine::handle_reply`]), from the deadline sweep
//! ([`CommandEngine::expire_due`]) or from [`CommandEngine::cancel`]. It never
//! blocks; the reactor feeds it replies and ticks.

use crate::failure::CommandFailure;
use crate::pending::{
    CorrelationKey, FailureCallback, PendingOperation, PendingTable, SuccessCallback,
};
use crate::transport::{Face, Packet};
use nac_command::{
    build_request, parse_reply, Certificate, Operation, Outcome, Reply, Signer, TrustStore,
};
use nac_core::{AgentConfig, Clock, Name, NacError, Result, RetryPolicy};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Result of an awaited command
pub type CommandResult = std::result::Result<Vec<u8>, CommandFailure>;

/// Signs, sends and correlates commands
pub struct CommandEngine {
    face: Arc<dyn Face>,
    signer: Arc<dyn Signer>,
    trust: Arc<RwLock<TrustStore>>,
    clock: Arc<dyn Clock>,
    config: AgentConfig,
    pending: PendingTable,
}

impl fmt::Debug for CommandEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEngine")
            .field("identity", self.signer.certificate().identity())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl CommandEngine {
    /// Create an engine sending through `face`
    pub fn new(
        face: Arc<dyn Face>,
        signer: Arc<dyn Signer>,
        trust: Arc<RwLock<TrustStore>>,
        clock: Arc<dyn Clock>,
        config: AgentConfig,
    ) -> Self {
        Self {
            face,
            signer,
            trust,
            clock,
            config,
            pending: PendingTable::new(),
        }
    }

    /// Sign and send a command; returns as soon as it is on the network
    ///
    /// Exactly one of the continuations runs later. If this returns `Err`
    /// the command was never sent and neither continuation runs.
    pub fn send_command(
        &self,
        target: &Name,
        operation: Operation,
        data_prefix: &Name,
        payload: impl Into<Vec<u8>>,
        on_success: SuccessCallback,
        on_failure: FailureCallback,
    ) -> Result<CorrelationKey> {
        let expected_signer = self.expected_signer(target)?;
        let request = build_request(
            target,
            operation,
            data_prefix,
            payload,
            self.signer.as_ref(),
            self.clock.as_ref(),
        )?;
        let key = CorrelationKey::new(request.name().clone());
        let deadline_ms = self.clock.now_ms().saturating_add(self.config.command_timeout_ms);

        self.pending.insert(
            key.clone(),
            PendingOperation {
                operation,
                target: target.clone(),
                expected_signer,
                deadline_ms,
                on_success,
                on_failure,
            },
        )?;

        if let Err(err) = self.face.send(Packet::Request(request.name().clone())) {
            self.pending.take(&key);
            tracing::warn!(
                node = %target,
                operation = %operation,
                error = %err,
                "Failed to send command"
            );
            return Err(err);
        }

        tracing::debug!(
            node = %target,
            operation = %operation,
            deadline_ms,
            "Command sent"
        );
        Ok(key)
    }

    /// Send a command and wait for its outcome
    ///
    /// Needs a running reactor to deliver the reply or the timeout.
    pub async fn request(
        &self,
        target: &Name,
        operation: Operation,
        data_prefix: &Name,
        payload: impl Into<Vec<u8>>,
    ) -> CommandResult {
        let (on_success, on_failure, rx) = oneshot_continuations();
        self.send_command(target, operation, data_prefix, payload, on_success, on_failure)?;
        rx.await.unwrap_or_else(|_| {
            Err(CommandFailure::Local {
                error: NacError::internal(format!("{operation} cancelled")),
            })
        })
    }

    /// [`CommandEngine::request`] with caller-level retry on timeouts
    ///
    /// Each attempt is a freshly signed command. Only
    /// [`CommandFailure::Timeout`] is retried.
    pub async fn request_with_retry(
        &self,
        policy: &RetryPolicy,
        target: &Name,
        operation: Operation,
        data_prefix: &Name,
        payload: &[u8],
    ) -> CommandResult {
        let mut attempt = 1;
        loop {
            match self.request(target, operation, data_prefix, payload.to_vec()).await {
                Err(failure) if failure.is_timeout() && attempt < policy.max_attempts => {
                    let backoff = policy.backoff_for(attempt);
                    tracing::warn!(
                        node = %target,
                        operation = %operation,
                        attempt,
                        max_attempts = policy.max_attempts,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        "Command timed out, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Resolve the pending operation a reply answers
    ///
    /// Returns `false` for replies that match nothing (late, duplicate or
    /// unsolicited); those are dropped.
    pub fn handle_reply(&self, reply: &Reply) -> bool {
        let key = CorrelationKey::new(reply.name().clone());
        let Some(operation) = self.pending.take(&key) else {
            tracing::debug!(name = %reply.name(), "Reply matches no pending operation");
            return false;
        };

        let label = operation.operation;
        match parse_reply(reply, &operation.expected_signer) {
            Ok(Outcome::Success(body)) => {
                tracing::debug!(operation = %label, bytes = body.len(), "Command succeeded");
                operation.succeed(reply.name().clone(), body);
            }
            Ok(Outcome::AlreadyExists(reason)) => {
                tracing::debug!(operation = %label, reason = %reason, "Command reported duplicate");
                operation.fail(CommandFailure::AlreadyExists { reason });
            }
            Ok(Outcome::OperationFailed(reason)) => {
                tracing::info!(operation = %label, reason = %reason, "Command refused");
                operation.fail(CommandFailure::Failed { reason });
            }
            Err(err @ NacError::SignatureInvalid { .. }) => {
                tracing::warn!(operation = %label, error = %err, "Reply signature rejected");
                operation.fail(CommandFailure::SignatureInvalid {
                    message: err.to_string(),
                });
            }
            Err(error) => operation.fail(CommandFailure::Local { error }),
        }
        true
    }

    /// Fail every operation whose deadline has passed; returns how many
    ///
    /// The network is told to stop waiting for replies to them.
    pub fn expire_due(&self) -> usize {
        let expired = self.pending.take_expired(self.clock.now_ms());
        let count = expired.len();
        for (key, operation) in expired {
            self.face.withdraw(key.name());
            tracing::warn!(name = %key, operation = %operation.operation, "Command timed out");
            let label = operation.operation.to_string();
            operation.fail(CommandFailure::Timeout { operation: label });
        }
        count
    }

    /// Drop a pending operation without running either continuation
    pub fn cancel(&self, key: &CorrelationKey) -> bool {
        let cancelled = self.pending.take(key).is_some();
        if cancelled {
            self.face.withdraw(key.name());
            tracing::debug!(name = %key, "Command cancelled");
        }
        cancelled
    }

    /// Number of in-flight commands
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Trust `certificate` for signing commands and replies
    pub fn add_trusted(&self, certificate: Certificate) {
        self.trust.write().insert(certificate);
    }

    /// Outbound face
    pub fn face(&self) -> &Arc<dyn Face> {
        &self.face
    }

    /// Signing identity
    pub fn signer(&self) -> &Arc<dyn Signer> {
        &self.signer
    }

    /// Clock used for timestamps and deadlines
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Shared trust store
    pub fn trust(&self) -> &Arc<RwLock<TrustStore>> {
        &self.trust
    }

    /// Engine configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn expected_signer(&self, target: &Name) -> Result<Certificate> {
        self.trust
            .read()
            .lookup(target)
            .cloned()
            .ok_or_else(|| NacError::not_found(format!("no trusted certificate for {target}")))
    }
}

/// Continuations that complete a oneshot channel
pub(crate) fn oneshot_continuations() -> (
    SuccessCallback,
    FailureCallback,
    oneshot::Receiver<CommandResult>,
) {
    let (tx, rx) = oneshot::channel();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let on_failure_tx = tx.clone();
    let on_success: SuccessCallback = Box::new(move |_name, body| {
        if let Some(tx) = tx.lock().take() {
            let _ = tx.send(Ok(body));
        }
    });
    let on_failure: FailureCallback = Box::new(move |failure| {
        if let Some(tx) = on_failure_tx.lock().take() {
            let _ = tx.send(Err(failure));
        }
    });
    (on_success, on_failure, rx)
}
