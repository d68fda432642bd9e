//! CLOAK Encryption Coprocessor
//!
//! Homomorphic computation over opaque ciphertext handles, with a per-handle
//! access control list and an asynchronous decryption oracle.
//!
//! # Key Features:
//! - Encrypt 64-bit magnitudes, add and subtract without decryption
//! - Handles instead of ciphertext bytes: callers never see encrypted data
//! - Transient and persistent compute rights per principal
//! - Fire-and-forget decryption requests fulfilled by a polling oracle
//!
//! # Architecture:
//! - [`Coprocessor`]: the operations callers consume
//! - [`FheCoprocessor`]: in-process implementation over a [`CiphertextBackend`]
//! - [`TfheBackend`]: TFHE-rs ciphertexts (feature `tfhe`)
//! - [`ClearBackend`]: plaintext simulation with identical semantics
//! - [`DecryptionOracle`]: fulfils queued decryptions

pub mod acl;
pub mod address;
pub mod backend;
pub mod coprocessor;
pub mod errors;
pub mod handle;
pub mod oracle;
#[cfg(feature = "tfhe")]
mod real_impl;

#[cfg(feature = "tfhe")]
pub use real_impl::*;
pub use acl::AccessControlList;
pub use address::Address;
pub use backend::{CiphertextBackend, ClearBackend, ClearCiphertext};
pub use coprocessor::{Coprocessor, DecryptionPoll, FheCoprocessor, TransactionScope};
pub use errors::FHEError;
pub use handle::CiphertextHandle;
pub use oracle::{DecryptionOracle, OracleConfig};

use serde::{Deserialize, Serialize};

/// FHE Configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FHEConfig {
    /// Security parameter (bits)
    pub security_bits: u32,
    /// Enable multi-threaded operations
    pub multi_threaded: bool,
}

impl Default for FHEConfig {
    fn default() -> Self {
        Self {
            security_bits: 128,
            multi_threaded: true,
        }
    }
}

/// Result type for FHE operations
pub type FHEResult<T> = Result<T, FHEError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = FHEConfig::default();
        assert_eq!(config.security_bits, 128);
        assert!(config.multi_threaded);
    }
}
