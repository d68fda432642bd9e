//! FHE Homomorphic Operations with Real TFHE-rs
//!
//! Server key must be installed on the calling thread, see
//! [`install_server_key`](super::keys::install_server_key).

use crate::FHEResult;
use super::ciphertext::FHEUint64;

/// FHE operations on encrypted u64 values
pub struct FHEOps;

impl FHEOps {
    /// Homomorphic addition (wrapping)
    pub fn add(a: &FHEUint64, b: &FHEUint64) -> FHEResult<FHEUint64> {
        let result = a.inner() + b.inner();

        Ok(FHEUint64::from_tfhe_with_ops(
            result,
            a.op_count().saturating_add(b.op_count()).saturating_add(1),
        ))
    }

    /// Homomorphic subtraction (wrapping)
    pub fn sub(a: &FHEUint64, b: &FHEUint64) -> FHEResult<FHEUint64> {
        let result = a.inner() - b.inner();

        Ok(FHEUint64::from_tfhe_with_ops(
            result,
            a.op_count().saturating_add(b.op_count()).saturating_add(1),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FHEConfig;
    use super::super::keys::{install_server_key, KeyPair};

    #[test]
    fn test_homomorphic_add_and_sub() {
        let keypair = KeyPair::generate(&FHEConfig::default()).unwrap();
        install_server_key(&keypair.server);

        let a = FHEUint64::encrypt(100, &keypair.client).unwrap();
        let b = FHEUint64::encrypt(30, &keypair.client).unwrap();

        let sum = FHEOps::add(&a, &b).unwrap();
        assert_eq!(sum.decrypt(&keypair.client).unwrap(), 130);
        assert_eq!(sum.op_count(), 1);

        let diff = FHEOps::sub(&sum, &b).unwrap();
        assert_eq!(diff.decrypt(&keypair.client).unwrap(), 100);
        assert_eq!(diff.op_count(), 2);
    }
}
