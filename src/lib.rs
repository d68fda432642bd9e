//! CLOAK: Confidential Liquidity Accumulator
//!
//! This is the root crate that re-exports all CLOAK components for integration
//! testing and provides a runtime that wires them together.
//!
//! ## Architecture Overview
//!
//! An AMM hook observes every liquidity change on the pools it is attached to
//! and folds the change into an encrypted per-pool total. The plaintext total
//! exists only after the pool owner requests a disclosure and the decryption
//! oracle fulfils it:
//!
//! - **Encrypted accumulation**: totals are ciphertext handles, updated with
//!   homomorphic add/sub
//! - **Owner-gated disclosure**: request, poll, retrieve, reset
//! - **Handle ACL**: only the hook may compute on or disclose its handles
//!
//! ## Crate Organization
//!
//! - `cloak-fhe`: ciphertext handles, ACL, coprocessor and decryption oracle
//! - `cloak-defi`: the confidential liquidity hook
//! - `cloak-cli`: the `cloak` operator binary

pub mod runtime;

// Re-export all crates for integration testing
pub use cloak_defi as defi;
pub use cloak_fhe as fhe;

pub use runtime::{CloakRuntime, RuntimeConfig, RuntimeError, RuntimeResult};

/// CLOAK protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration defaults
pub mod config {
    /// Default capacity of the runtime's event channel
    pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

    /// Default time a caller waits for a disclosure
    pub const DEFAULT_DISCLOSURE_TIMEOUT_MS: u64 = 30_000;

    /// FHE configuration defaults
    pub mod fhe {
        /// Default FHE security parameter
        pub const DEFAULT_SECURITY_PARAM: u32 = 128;
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use cloak_defi::prelude::*;
    pub use cloak_fhe::{Address, ClearBackend, Coprocessor, DecryptionOracle, FheCoprocessor, OracleConfig};
    pub use crate::runtime::{CloakRuntime, RuntimeConfig, RuntimeError};
}
