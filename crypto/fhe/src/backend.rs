//! Ciphertext backends
//!
//! The coprocessor keeps handle bookkeeping and ACLs itself and delegates the
//! actual cryptography to a [`CiphertextBackend`]. Two backends exist:
//! [`TfheBackend`](crate::TfheBackend) (TFHE-rs, the real thing) and
//! [`ClearBackend`], which stores values in the clear with identical wrapping
//! semantics for simulation and tests.

use crate::FHEResult;

/// Cryptographic engine behind a coprocessor
pub trait CiphertextBackend: Send + Sync + 'static {
    /// Ciphertext representation stored per handle
    type Ciphertext: Clone + Send + Sync + 'static;

    /// Backend name for logs and config
    fn name(&self) -> &'static str;

    /// Encrypt a 64-bit plaintext
    fn encrypt(&self, value: u64) -> FHEResult<Self::Ciphertext>;

    /// Homomorphic addition (wrapping modulo 2^64)
    fn add(&self, lhs: &Self::Ciphertext, rhs: &Self::Ciphertext) -> FHEResult<Self::Ciphertext>;

    /// Homomorphic subtraction (wrapping modulo 2^64)
    fn sub(&self, lhs: &Self::Ciphertext, rhs: &Self::Ciphertext) -> FHEResult<Self::Ciphertext>;

    /// Decrypt. Only the decryption oracle calls this.
    fn decrypt(&self, ciphertext: &Self::Ciphertext) -> FHEResult<u64>;
}

/// Plaintext backend. Offers no confidentiality.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearBackend;

/// A "ciphertext" of the clear backend
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ClearCiphertext(u64);

impl std::fmt::Debug for ClearCiphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ClearCiphertext(<hidden>)")
    }
}

impl CiphertextBackend for ClearBackend {
    type Ciphertext = ClearCiphertext;

    fn name(&self) -> &'static str {
        "clear"
    }

    fn encrypt(&self, value: u64) -> FHEResult<ClearCiphertext> {
        Ok(ClearCiphertext(value))
    }

    fn add(&self, lhs: &ClearCiphertext, rhs: &ClearCiphertext) -> FHEResult<ClearCiphertext> {
        Ok(ClearCiphertext(lhs.0.wrapping_add(rhs.0)))
    }

    fn sub(&self, lhs: &ClearCiphertext, rhs: &ClearCiphertext) -> FHEResult<ClearCiphertext> {
        Ok(ClearCiphertext(lhs.0.wrapping_sub(rhs.0)))
    }

    fn decrypt(&self, ciphertext: &ClearCiphertext) -> FHEResult<u64> {
        Ok(ciphertext.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_backend_wraps_like_uint64() {
        let b = ClearBackend;
        let zero = b.encrypt(0).unwrap();
        let one = b.encrypt(1).unwrap();
        let under = b.sub(&zero, &one).unwrap();
        assert_eq!(b.decrypt(&under).unwrap(), u64::MAX);
        assert_eq!(b.decrypt(&b.add(&under, &one).unwrap()).unwrap(), 0);
    }

    #[test]
    fn test_clear_ciphertext_debug_hides_value() {
        let ct = ClearBackend.encrypt(1234).unwrap();
        assert!(!format!("{:?}", ct).contains("1234"));
    }
}
