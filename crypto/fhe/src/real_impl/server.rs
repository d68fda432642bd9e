//! TFHE compute server
//!
//! Runs homomorphic arithmetic for the coprocessor without learning the
//! values involved. The client key stays inside the backend and is used only
//! by [`CiphertextBackend::decrypt`], which the decryption oracle drives.

use tracing::debug;

use crate::backend::CiphertextBackend;
use crate::{FHEConfig, FHEResult};
use super::ciphertext::FHEUint64;
use super::keys::{install_server_key, KeyPair};
use super::operations::FHEOps;

/// TFHE-rs backed ciphertext engine
pub struct TfheBackend {
    keys: KeyPair,
}

impl TfheBackend {
    /// Generate fresh keys for a new backend
    pub fn new(config: &FHEConfig) -> FHEResult<Self> {
        debug!(security_bits = config.security_bits, "Generating TFHE keys");
        Ok(Self::from_keys(KeyPair::generate(config)?))
    }

    /// Use an existing key pair
    pub fn from_keys(keys: KeyPair) -> Self {
        Self { keys }
    }

    /// Apply a signed update to an encrypted value
    pub fn update(&self, current: &FHEUint64, delta: &FHEUint64, is_credit: bool) -> FHEResult<FHEUint64> {
        install_server_key(&self.keys.server);
        if is_credit {
            FHEOps::add(current, delta)
        } else {
            FHEOps::sub(current, delta)
        }
    }
}

impl std::fmt::Debug for TfheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfheBackend").field("keys", &self.keys).finish()
    }
}

impl CiphertextBackend for TfheBackend {
    type Ciphertext = FHEUint64;

    fn name(&self) -> &'static str {
        "tfhe"
    }

    fn encrypt(&self, value: u64) -> FHEResult<FHEUint64> {
        FHEUint64::encrypt(value, &self.keys.client)
    }

    fn add(&self, lhs: &FHEUint64, rhs: &FHEUint64) -> FHEResult<FHEUint64> {
        self.update(lhs, rhs, true)
    }

    fn sub(&self, lhs: &FHEUint64, rhs: &FHEUint64) -> FHEResult<FHEUint64> {
        self.update(lhs, rhs, false)
    }

    fn decrypt(&self, ciphertext: &FHEUint64) -> FHEResult<u64> {
        ciphertext.decrypt(&self.keys.client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_update() {
        let backend = TfheBackend::new(&FHEConfig::default()).unwrap();

        let balance = backend.encrypt(1000).unwrap();
        let delta = backend.encrypt(250).unwrap();

        let credited = backend.add(&balance, &delta).unwrap();
        assert_eq!(backend.decrypt(&credited).unwrap(), 1250);

        let debited = backend.sub(&balance, &delta).unwrap();
        assert_eq!(backend.decrypt(&debited).unwrap(), 750);
    }

    #[test]
    fn test_subtraction_wraps() {
        let backend = TfheBackend::new(&FHEConfig::default()).unwrap();

        let zero = backend.encrypt(0).unwrap();
        let one = backend.encrypt(1).unwrap();
        let wrapped = backend.sub(&zero, &one).unwrap();
        assert_eq!(backend.decrypt(&wrapped).unwrap(), u64::MAX);
    }
}
