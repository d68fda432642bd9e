//! Coprocessor error types

use thiserror::Error;

use crate::address::Address;
use crate::handle::CiphertextHandle;

/// Errors that can occur inside the encryption coprocessor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FHEError {
    /// A handle was used by a principal that holds no grant on it
    #[error("ACL violation: {principal} has no compute rights on {handle}")]
    AclViolation {
        handle: CiphertextHandle,
        principal: Address,
    },

    /// The handle does not reference any stored ciphertext
    #[error("Unknown ciphertext handle: {0}")]
    UnknownHandle(CiphertextHandle),

    /// Key generation failed
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Homomorphic operation failed
    #[error("Homomorphic operation failed: {0}")]
    OperationFailed(String),

    /// Invalid key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl FHEError {
    /// Whether the error is an ACL violation.
    ///
    /// ACL violations leave the offending handle permanently unusable for the
    /// principal, so callers must not retry them.
    pub fn is_acl_violation(&self) -> bool {
        matches!(self, FHEError::AclViolation { .. })
    }
}
