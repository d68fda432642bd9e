//! Hook Error Types

use cloak_fhe::FHEError;
use thiserror::Error;

use crate::pool::PoolId;

/// Errors returned by the hook's callbacks and entry points
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HookError {
    // Access control
    #[error("Unauthorized: caller is not the pool owner")]
    Unauthorized,

    // Disclosure protocol
    #[error("Decryption already requested for this pool")]
    AlreadyRequested,

    #[error("No decryption requested for this pool")]
    NotRequested,

    #[error("Decryption results are not ready")]
    NotReady,

    // Pool errors
    #[error("Pool not found: {0}")]
    PoolNotFound(PoolId),

    #[error("Pool already initialized: {0}")]
    PoolAlreadyInitialized(PoolId),

    #[error("Invalid pool key: {0}")]
    InvalidPoolKey(String),

    #[error("Liquidity delta {0} exceeds the 64-bit tracking range")]
    DeltaOutOfRange(i128),

    // Coprocessor errors
    #[error("ACL violation: {0}")]
    AclViolation(String),

    #[error("Coprocessor error: {0}")]
    Coprocessor(FHEError),
}

impl HookError {
    /// Whether the failure is fatal for the pool state and must not be retried
    pub fn is_fatal(&self) -> bool {
        matches!(self, HookError::AclViolation(_))
    }
}

impl From<FHEError> for HookError {
    fn from(err: FHEError) -> Self {
        if err.is_acl_violation() {
            HookError::AclViolation(err.to_string())
        } else {
            HookError::Coprocessor(err)
        }
    }
}

/// Result type for hook operations
pub type HookResult<T> = Result<T, HookError>;
