//! Encrypted 64-bit values backed by TFHE-rs

use crate::{FHEError, FHEResult};
use super::keys::ClientKey;
use tfhe::prelude::*;
use tfhe::FheUint64 as TfheFheUint64;

/// Encrypted 64-bit unsigned integer
#[derive(Clone)]
pub struct FHEUint64 {
    /// Inner TFHE-rs encrypted value
    inner: TfheFheUint64,
    /// Operation count for noise tracking
    op_count: u32,
}

impl FHEUint64 {
    /// Encrypt a u64 value with the client key
    pub fn encrypt(value: u64, client_key: &ClientKey) -> FHEResult<Self> {
        let encrypted = TfheFheUint64::try_encrypt(value, client_key.inner())
            .map_err(|e| FHEError::EncryptionFailed(e.to_string()))?;

        Ok(Self {
            inner: encrypted,
            op_count: 0,
        })
    }

    /// Decrypt to u64 using the client key
    pub fn decrypt(&self, client_key: &ClientKey) -> FHEResult<u64> {
        let result: u64 = self.inner.decrypt(client_key.inner());
        Ok(result)
    }

    /// Get reference to inner TFHE value
    pub fn inner(&self) -> &TfheFheUint64 {
        &self.inner
    }

    /// Create from TFHE FheUint64 with operation count
    pub fn from_tfhe_with_ops(inner: TfheFheUint64, op_count: u32) -> Self {
        Self { inner, op_count }
    }

    /// Get operation count
    pub fn op_count(&self) -> u32 {
        self.op_count
    }
}

impl std::fmt::Debug for FHEUint64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FHEUint64")
            .field("ops", &self.op_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FHEConfig;
    use super::super::keys::KeyPair;

    #[test]
    fn test_encrypt_decrypt() {
        let keypair = KeyPair::generate(&FHEConfig::default()).unwrap();

        let encrypted = FHEUint64::encrypt(12345, &keypair.client).unwrap();
        assert_eq!(encrypted.decrypt(&keypair.client).unwrap(), 12345);
        assert_eq!(encrypted.op_count(), 0);
    }

    #[test]
    fn test_encrypt_zero() {
        let keypair = KeyPair::generate(&FHEConfig::default()).unwrap();

        let encrypted = FHEUint64::encrypt(0, &keypair.client).unwrap();
        assert_eq!(encrypted.decrypt(&keypair.client).unwrap(), 0);
    }
}
