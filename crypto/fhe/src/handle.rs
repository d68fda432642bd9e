//! Ciphertext handles
//!
//! A handle is an opaque reference to a ciphertext stored by the coprocessor.
//! It carries no ciphertext bytes and no plaintext; the only way to obtain one
//! is through a [`Coprocessor`](crate::Coprocessor) operation.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Domain separator for handle derivation
const HANDLE_DOMAIN: &[u8] = b"cloak-ciphertext-handle-v1";

/// Opaque reference to an encrypted value held by the coprocessor
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CiphertextHandle([u8; 32]);

impl CiphertextHandle {
    /// Derive a fresh handle from the producing operation, its operands and a
    /// coprocessor-unique nonce.
    pub(crate) fn derive(op: HandleOp, operands: &[&CiphertextHandle], nonce: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(HANDLE_DOMAIN);
        hasher.update(&[op as u8]);
        for operand in operands {
            hasher.update(&operand.0);
        }
        hasher.update(&nonce.to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Raw handle bytes (the coprocessor's storage key, not ciphertext)
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short hex prefix for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

/// Operation that produced a handle, mixed into the derivation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum HandleOp {
    Encrypt = 1,
    Add = 2,
    Sub = 3,
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({}..)", self.short())
    }
}

impl Serialize for CiphertextHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CiphertextHandle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s))
            .map_err(serde::de::Error::custom)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("ciphertext handle must be 32 bytes"))?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_separates_identical_operations() {
        let a = CiphertextHandle::derive(HandleOp::Encrypt, &[], 1);
        let b = CiphertextHandle::derive(HandleOp::Encrypt, &[], 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_operation_tag_is_bound() {
        let x = CiphertextHandle::derive(HandleOp::Encrypt, &[], 1);
        let add = CiphertextHandle::derive(HandleOp::Add, &[&x, &x], 7);
        let sub = CiphertextHandle::derive(HandleOp::Sub, &[&x, &x], 7);
        assert_ne!(add, sub);
    }

    #[test]
    fn test_debug_does_not_print_full_handle() {
        let h = CiphertextHandle::derive(HandleOp::Encrypt, &[], 9);
        let debug = format!("{:?}", h);
        assert!(debug.len() < h.to_string().len());
    }
}
