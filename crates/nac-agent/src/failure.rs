//! Failures delivered to command continuations

use nac_core::NacError;

/// Why a command did not succeed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandFailure {
    /// The target already held the requested state
    #[error("Already exists: {reason}")]
    AlreadyExists {
        /// Reason reported by the target
        reason: String,
    },

    /// The target refused the command
    #[error("Operation failed: {reason}")]
    Failed {
        /// Reason reported by the target
        reason: String,
    },

    /// The reply was not signed by the node the command was sent to
    #[error("Signature invalid: {message}")]
    SignatureInvalid {
        /// Verification failure
        message: String,
    },

    /// No reply arrived before the deadline
    #[error("Timeout: {operation}")]
    Timeout {
        /// Operation that timed out
        operation: String,
    },

    /// The command never reached the network, or its result could not be used
    #[error("Local error: {error}")]
    Local {
        /// Underlying error
        error: NacError,
    },
}

impl CommandFailure {
    /// Whether the target reported a duplicate submission
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Whether the failure was a timeout, the only failure worth retrying
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<NacError> for CommandFailure {
    fn from(error: NacError) -> Self {
        Self::Local { error }
    }
}

impl From<CommandFailure> for NacError {
    fn from(failure: CommandFailure) -> Self {
        match failure {
            CommandFailure::AlreadyExists { reason } => {
                NacError::operation_failed(format!("already exists: {reason}"))
            }
            CommandFailure::Failed { reason } => NacError::operation_failed(reason),
            CommandFailure::SignatureInvalid { message } => NacError::signature_invalid(message),
            CommandFailure::Timeout { operation } => NacError::timeout(operation),
            CommandFailure::Local { error } => error,
        }
    }
}
