//! Access control list for ciphertext handles
//!
//! Two kinds of allowance exist:
//! - *transient*: granted automatically to the principal that produced a handle,
//!   valid until that principal's transaction ends
//! - *persistent*: granted explicitly, valid until the coprocessor forgets the
//!   handle
//!
//! A handle that leaves its transaction without a persistent grant can no
//! longer be used by anyone.

use std::collections::{HashMap, HashSet};

use crate::address::Address;
use crate::errors::FHEError;
use crate::handle::CiphertextHandle;
use crate::FHEResult;

/// Per-handle permission registry
#[derive(Debug, Default)]
pub struct AccessControlList {
    persistent: HashMap<CiphertextHandle, HashSet<Address>>,
    transient: HashMap<Address, HashSet<CiphertextHandle>>,
}

impl AccessControlList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `principal` to use `handle` until its transaction ends
    pub fn allow_transient(&mut self, handle: CiphertextHandle, principal: Address) {
        self.transient.entry(principal).or_default().insert(handle);
    }

    /// Allow `principal` to use `handle` across transactions
    pub fn allow(&mut self, handle: CiphertextHandle, principal: Address) {
        self.persistent.entry(handle).or_default().insert(principal);
    }

    /// Check whether `principal` may use `handle`
    pub fn is_allowed(&self, handle: &CiphertextHandle, principal: &Address) -> bool {
        let persistent = self
            .persistent
            .get(handle)
            .map_or(false, |set| set.contains(principal));
        persistent
            || self
                .transient
                .get(principal)
                .map_or(false, |set| set.contains(handle))
    }

    /// Fail with [`FHEError::AclViolation`] unless `principal` may use `handle`
    pub fn require(&self, handle: &CiphertextHandle, principal: &Address) -> FHEResult<()> {
        if self.is_allowed(handle, principal) {
            Ok(())
        } else {
            Err(FHEError::AclViolation {
                handle: *handle,
                principal: *principal,
            })
        }
    }

    /// Drop every transient allowance held by `principal`.
    ///
    /// Returns the handles left with no allowance for any principal. Nobody
    /// can use those again, so their ciphertexts may be freed.
    pub fn clear_transient(&mut self, principal: &Address) -> Vec<CiphertextHandle> {
        let Some(handles) = self.transient.remove(principal) else {
            return Vec::new();
        };
        handles
            .into_iter()
            .filter(|h| !self.has_any_grant(h))
            .collect()
    }

    /// Whether any principal may still use `handle`
    pub fn has_any_grant(&self, handle: &CiphertextHandle) -> bool {
        self.persistent
            .get(handle)
            .map_or(false, |set| !set.is_empty())
            || self.transient.values().any(|set| set.contains(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::HandleOp;

    fn handle(nonce: u64) -> CiphertextHandle {
        CiphertextHandle::derive(HandleOp::Encrypt, &[], nonce)
    }

    #[test]
    fn test_transient_allowance_is_scoped_to_principal() {
        let mut acl = AccessControlList::new();
        let alice = Address::repeat_byte(1);
        let bob = Address::repeat_byte(2);
        let h = handle(1);

        acl.allow_transient(h, alice);
        assert!(acl.is_allowed(&h, &alice));
        assert!(!acl.is_allowed(&h, &bob));
    }

    #[test]
    fn test_clear_transient_revokes_ungranted_handles() {
        let mut acl = AccessControlList::new();
        let hook = Address::repeat_byte(9);
        let kept = handle(1);
        let dropped = handle(2);

        acl.allow_transient(kept, hook);
        acl.allow_transient(dropped, hook);
        acl.allow(kept, hook);

        assert_eq!(acl.clear_transient(&hook), vec![dropped]);
        assert!(acl.is_allowed(&kept, &hook));
        assert!(acl.has_any_grant(&kept));
        assert!(!acl.has_any_grant(&dropped));
        assert!(!acl.is_allowed(&dropped, &hook));
        assert!(acl.require(&dropped, &hook).unwrap_err().is_acl_violation());
    }

    #[test]
    fn test_clear_transient_for_unknown_principal() {
        let mut acl = AccessControlList::new();
        assert!(acl.clear_transient(&Address::ZERO).is_empty());
    }

    #[test]
    fn test_handle_granted_elsewhere_is_not_orphaned() {
        let mut acl = AccessControlList::new();
        let hook = Address::repeat_byte(9);
        let auditor = Address::repeat_byte(10);
        let h = handle(1);

        acl.allow_transient(h, hook);
        acl.allow(h, auditor);

        assert!(acl.clear_transient(&hook).is_empty());
        assert!(!acl.is_allowed(&h, &hook));
        assert!(acl.is_allowed(&h, &auditor));
    }
}
