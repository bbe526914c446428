//! Pending operation table
//!
//! Every in-flight command has exactly one entry. Whoever removes the entry
//! (a reply, the deadline sweep, or a cancel) owns its continuations, so
//! each operation completes at most once no matter how those events race.

use crate::failure::CommandFailure;
use nac_command::{Certificate, Operation};
use nac_core::{Name, NacError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;

/// Continuation run on success with the echoed command name and reply body
pub type SuccessCallback = Box<dyn FnOnce(Name, Vec<u8>) + Send + 'static>;

/// Continuation run on any failure
pub type FailureCallback = Box<dyn FnOnce(CommandFailure) + Send + 'static>;

/// Correlates a reply with its command: the full signed command name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey(Name);

impl CorrelationKey {
    /// Key for the command named `name`
    pub fn new(name: Name) -> Self {
        Self(name)
    }

    /// The command name
    pub fn name(&self) -> &Name {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One in-flight command
pub struct PendingOperation {
    /// What was asked
    pub operation: Operation,
    /// Node the command was sent to
    pub target: Name,
    /// Certificate the reply must be signed with
    pub expected_signer: Certificate,
    /// Absolute deadline in clock milliseconds
    pub deadline_ms: u64,
    pub(crate) on_success: SuccessCallback,
    pub(crate) on_failure: FailureCallback,
}

impl PendingOperation {
    /// Run the success continuation, consuming the entry
    pub fn succeed(self, name: Name, body: Vec<u8>) {
        (self.on_success)(name, body);
    }

    /// Run the failure continuation, consuming the entry
    pub fn fail(self, failure: CommandFailure) {
        (self.on_failure)(failure);
    }
}

impl fmt::Debug for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperation")
            .field("operation", &self.operation)
            .field("target", &self.target)
            .field("deadline_ms", &self.deadline_ms)
            .finish_non_exhaustive()
    }
}

/// Correlation key -> pending operation
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: Mutex<HashMap<CorrelationKey, PendingOperation>>,
}

impl PendingTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new operation
    pub fn insert(&self, key: CorrelationKey, operation: PendingOperation) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            return Err(NacError::invalid(format!("operation {key} already pending")));
        }
        entries.insert(key, operation);
        Ok(())
    }

    /// Remove and return the entry for `key`
    pub fn take(&self, key: &CorrelationKey) -> Option<PendingOperation> {
        self.entries.lock().remove(key)
    }

    /// Remove and return every entry whose deadline is at or before `now_ms`
    pub fn take_expired(&self, now_ms: u64) -> Vec<(CorrelationKey, PendingOperation)> {
        let mut entries = self.entries.lock();
        let expired: Vec<CorrelationKey> = entries
            .iter()
            .filter(|(_, op)| op.deadline_ms <= now_ms)
            .map(|(key, _)| key.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|key| entries.remove(&key).map(|op| (key, op)))
            .collect()
    }

    /// Earliest deadline among pending operations
    pub fn next_deadline(&self) -> Option<u64> {
        self.entries.lock().values().map(|op| op.deadline_ms).min()
    }

    /// Number of in-flight operations
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is in flight
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
