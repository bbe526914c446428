//! Unified error system for NAC
//!
//! A single error type shared by every crate in the workspace. Cryptographic,
//! parsing and protocol failures all surface as `NacError` variants so callers
//! can branch on the failure class without juggling per-crate error enums.

use serde::{Deserialize, Serialize};

/// Unified error type for all NAC operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum NacError {
    /// Policy text could not be parsed into an access tree
    #[error("Policy syntax error: {message}")]
    PolicySyntax {
        /// Description of the syntax problem, including the offending token
        message: String,
    },

    /// An attribute outside the authority's universe was referenced
    #[error("Unknown attribute: {attribute}")]
    UnknownAttribute {
        /// The attribute that is not part of the universe
        attribute: String,
    },

    /// The decryption key does not satisfy the ciphertext policy
    #[error("Policy not satisfied by the presented attributes")]
    PolicyNotSatisfied,

    /// Ciphertext is structurally corrupt or was tampered with
    #[error("Malformed ciphertext: {message}")]
    MalformedCiphertext {
        /// Error message describing the corruption
        message: String,
    },

    /// A signature failed verification or was made by the wrong key
    #[error("Signature invalid: {message}")]
    SignatureInvalid {
        /// Error message describing the verification failure
        message: String,
    },

    /// The remote side reported a business failure
    #[error("Operation failed: {reason}")]
    OperationFailed {
        /// Reason string reported by the remote side
        reason: String,
    },

    /// No reply arrived before the deadline
    #[error("Timeout: {operation}")]
    Timeout {
        /// The operation that timed out
        operation: String,
    },

    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Cryptographic operation failed
    #[error("Crypto error: {message}")]
    Crypto {
        /// Error message describing the cryptographic failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Transport could not accept or deliver a packet
    #[error("Transport error: {message}")]
    Transport {
        /// Error message describing the transport issue
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl NacError {
    /// Create a policy syntax error
    pub fn policy_syntax(message: impl Into<String>) -> Self {
        Self::PolicySyntax {
            message: message.into(),
        }
    }

    /// Create an unknown attribute error
    pub fn unknown_attribute(attribute: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            attribute: attribute.into(),
        }
    }

    /// Create a malformed ciphertext error
    pub fn malformed_ciphertext(message: impl Into<String>) -> Self {
        Self::MalformedCiphertext {
            message: message.into(),
        }
    }

    /// Create a signature error
    pub fn signature_invalid(message: impl Into<String>) -> Self {
        Self::SignatureInvalid {
            message: message.into(),
        }
    }

    /// Create a remote operation failure
    pub fn operation_failed(reason: impl Into<String>) -> Self {
        Self::OperationFailed {
            reason: reason.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error is an expected, recoverable rejection rather than a fault.
    ///
    /// `PolicyNotSatisfied` is the normal answer for a consumer without the
    /// right attributes, so callers usually log it at a lower level.
    pub fn is_expected_rejection(&self) -> bool {
        matches!(self, Self::PolicyNotSatisfied)
    }
}

/// Standard Result type for NAC operations
pub type Result<T> = std::result::Result<T, NacError>;

impl From<bincode::Error> for NacError {
    fn from(err: bincode::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<toml::de::Error> for NacError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<std::io::Error> for NacError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = NacError::policy_syntax("unbalanced parenthesis");
        assert!(matches!(err, NacError::PolicySyntax { .. }));
        assert_eq!(
            err.to_string(),
            "Policy syntax error: unbalanced parenthesis"
        );
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing config");
        let nac_err = NacError::from(io_err);
        assert!(matches!(nac_err, NacError::NotFound { .. }));
    }

    #[test]
    fn test_expected_rejection() {
        assert!(NacError::PolicyNotSatisfied.is_expected_rejection());
        assert!(!NacError::malformed_ciphertext("bad leaf").is_expected_rejection());
    }
}
