//! Owner registry and owner-only guard
//!
//! Each pool has exactly one owner, recorded once at initialization and never
//! changed. The guard is a plain equality check against that address.

use std::collections::HashMap;

use cloak_fhe::Address;

use crate::errors::{HookError, HookResult};
use crate::pool::PoolId;

/// Per-pool owner registry
#[derive(Debug, Default)]
pub struct OwnerRegistry {
    owners: HashMap<PoolId, Address>,
}

impl OwnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `owner` for `pool_id`. Fails if the slot is already taken.
    pub fn register(&mut self, pool_id: PoolId, owner: Address) -> HookResult<()> {
        if self.owners.contains_key(&pool_id) {
            return Err(HookError::PoolAlreadyInitialized(pool_id));
        }
        self.owners.insert(pool_id, owner);
        Ok(())
    }

    /// Registered owner of a pool
    pub fn owner_of(&self, pool_id: &PoolId) -> Option<Address> {
        self.owners.get(pool_id).copied()
    }

    /// Whether `caller` owns `pool_id`. False for unknown pools.
    pub fn is_owner(&self, pool_id: &PoolId, caller: &Address) -> bool {
        self.owners.get(pool_id) == Some(caller)
    }

    /// Fail unless `caller` owns `pool_id`
    pub fn require_owner(&self, pool_id: &PoolId, caller: &Address) -> HookResult<()> {
        match self.owners.get(pool_id) {
            None => Err(HookError::PoolNotFound(*pool_id)),
            Some(owner) if owner == caller => Ok(()),
            Some(_) => Err(HookError::Unauthorized),
        }
    }

    pub fn is_registered(&self, pool_id: &PoolId) -> bool {
        self.owners.contains_key(pool_id)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
