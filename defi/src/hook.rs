//! Confidential liquidity hook
//!
//! Host-facing callbacks ([`HostCallbacks`]) keep an encrypted running total
//! of liquidity per pool; owner-facing entry points drive the disclosure of
//! that total. Each entry point runs as one coprocessor transaction and writes
//! pool state only after every coprocessor call in it succeeded.

use std::collections::HashMap;
use std::sync::Arc;

use cloak_fhe::{Address, Coprocessor, TransactionScope};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::accumulator::{EncryptedAccumulator, TrackingMode};
use crate::disclosure::{self, DecryptionRequest, DisclosureState};
use crate::errors::{HookError, HookResult};
use crate::events::{EventSink, HookEvent};
use crate::guard::OwnerRegistry;
use crate::pool::{ModifyLiquidityParams, PoolId, PoolKey};
use crate::tracker::{self, LiquidityDelta};

/// Address the hook acts as when none is configured
pub const DEFAULT_HOOK_ADDRESS: Address = Address::repeat_byte(0xc1);

/// Hook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Principal the hook uses against the coprocessor
    pub address: Address,
    /// Which pool sides receive deltas
    pub tracking: TrackingMode,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_HOOK_ADDRESS,
            tracking: TrackingMode::default(),
        }
    }
}

impl HookConfig {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    pub fn with_tracking(mut self, tracking: TrackingMode) -> Self {
        self.tracking = tracking;
        self
    }
}

/// Who is calling: the immediate caller and the transaction's originator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub sender: Address,
    pub origin: Address,
}

impl CallContext {
    pub fn new(sender: Address, origin: Address) -> Self {
        Self { sender, origin }
    }
}

/// Callbacks the host AMM invokes on the hook
pub trait HostCallbacks {
    /// A pool was initialized; the transaction's originator becomes its owner
    fn on_pool_initialized(&mut self, ctx: &CallContext, key: &PoolKey) -> HookResult<PoolId>;

    /// Liquidity is about to change by `signed_delta`
    fn on_liquidity_will_change(&mut self, pool_id: &PoolId, signed_delta: i128) -> HookResult<()>;

    /// Before-add/before-remove liquidity callback
    fn on_modify_liquidity(
        &mut self,
        ctx: &CallContext,
        key: &PoolKey,
        params: &ModifyLiquidityParams,
    ) -> HookResult<()> {
        let pool_id = key.to_id();
        debug!(pool = %pool_id, sender = %ctx.sender, "Modify liquidity");
        self.on_liquidity_will_change(&pool_id, params.liquidity_delta)
    }
}

/// Per-pool state owned by the hook
#[derive(Debug, Clone)]
struct PoolRecord {
    accumulator: EncryptedAccumulator,
    request: Option<DecryptionRequest>,
}

/// Confidential accumulator and disclosure coordinator
pub struct ConfidentialLiquidityHook<C: Coprocessor + ?Sized, E: EventSink> {
    config: HookConfig,
    coprocessor: Arc<C>,
    events: E,
    owners: OwnerRegistry,
    pools: HashMap<PoolId, PoolRecord>,
    next_request: u64,
}

impl<C: Coprocessor + ?Sized, E: EventSink> ConfidentialLiquidityHook<C, E> {
    pub fn new(config: HookConfig, coprocessor: Arc<C>, events: E) -> Self {
        info!(hook = %config.address, tracking = ?config.tracking, "Confidential liquidity hook ready");
        Self {
            config,
            coprocessor,
            events,
            owners: OwnerRegistry::new(),
            pools: HashMap::new(),
            next_request: 1,
        }
    }

    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn coprocessor(&self) -> &Arc<C> {
        &self.coprocessor
    }

    fn transaction(&self) -> TransactionScope<C> {
        TransactionScope::begin(&self.coprocessor, self.config.address)
    }

    fn record(&self, pool_id: &PoolId) -> HookResult<&PoolRecord> {
        self.pools.get(pool_id).ok_or(HookError::PoolNotFound(*pool_id))
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Register `initiator` as owner and start the pool at encrypted zero
    pub fn initialize_pool(&mut self, pool_id: PoolId, initiator: Address) -> HookResult<()> {
        if self.owners.is_registered(&pool_id) {
            return Err(HookError::PoolAlreadyInitialized(pool_id));
        }

        let accumulator = EncryptedAccumulator::zero(&self.transaction())?;

        self.owners.register(pool_id, initiator)?;
        self.pools.insert(
            pool_id,
            PoolRecord {
                accumulator,
                request: None,
            },
        );
        info!(pool = %pool_id.short(), owner = %initiator, "Pool tracking initialized");
        Ok(())
    }

    /// Owner-only: restart the pool at encrypted zero and drop any disclosure
    pub fn reset_tracking(&mut self, pool_id: &PoolId, caller: &Address) -> HookResult<()> {
        self.owners.require_owner(pool_id, caller)?;

        let accumulator = EncryptedAccumulator::zero(&self.transaction())?;

        let record = self
            .pools
            .get_mut(pool_id)
            .ok_or(HookError::PoolNotFound(*pool_id))?;
        let abandoned = record.request.take();
        record.accumulator = accumulator;

        if let Some(request) = abandoned {
            debug!(pool = %pool_id.short(), sequence = request.sequence(), "Abandoned decryption request");
        }
        info!(pool = %pool_id.short(), caller = %caller, "Tracking reset");
        self.events.emit(HookEvent::TrackingReset {
            pool_id: *pool_id,
            caller: *caller,
        });
        Ok(())
    }

    // =========================================================================
    // DISCLOSURE
    // =========================================================================

    /// Owner-only: submit the current totals for decryption
    pub fn request_decryption(&mut self, pool_id: &PoolId, caller: &Address) -> HookResult<()> {
        self.owners.require_owner(pool_id, caller)?;
        let record = self.record(pool_id)?;
        if record.request.is_some() {
            return Err(HookError::AlreadyRequested);
        }

        let sequence = self.next_request;
        let request =
            DecryptionRequest::submit(&self.transaction(), &record.accumulator, *caller, sequence)?;

        self.next_request += 1;
        if let Some(record) = self.pools.get_mut(pool_id) {
            record.request = Some(request);
        }
        info!(pool = %pool_id.short(), requester = %caller, sequence, "Decryption requested");
        self.events.emit(HookEvent::DecryptionRequested {
            pool_id: *pool_id,
            requester: *caller,
        });
        Ok(())
    }

    /// `(requested, ready)`. Never fails and never mutates.
    pub fn is_decryption_ready(&self, pool_id: &PoolId) -> (bool, bool) {
        let request = self.pools.get(pool_id).and_then(|r| r.request.as_ref());
        disclosure::readiness(self.coprocessor.as_ref(), request)
    }

    /// Plaintext totals of the outstanding request.
    ///
    /// Totals are sums modulo 2^64: a pool whose removals exceed its
    /// additions by 5 reports `u64::MAX - 4` (2^64 - 5), not -5.
    pub fn get_decrypted_metrics(&self, pool_id: &PoolId) -> HookResult<(u64, u64)> {
        let record = self.record(pool_id)?;
        disclosure::retrieve(self.coprocessor.as_ref(), record.request.as_ref())
    }

    pub fn disclosure_state(&self, pool_id: &PoolId) -> DisclosureState {
        let request = self.pools.get(pool_id).and_then(|r| r.request.as_ref());
        DisclosureState::of(self.coprocessor.as_ref(), request)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn is_owner(&self, pool_id: &PoolId, caller: &Address) -> bool {
        self.owners.is_owner(pool_id, caller)
    }

    pub fn owner_of(&self, pool_id: &PoolId) -> Option<Address> {
        self.owners.owner_of(pool_id)
    }

    /// Current accumulator handles (never plaintext)
    pub fn accumulator(&self, pool_id: &PoolId) -> Option<&EncryptedAccumulator> {
        self.pools.get(pool_id).map(|r| &r.accumulator)
    }

    pub fn pending_request(&self, pool_id: &PoolId) -> Option<&DecryptionRequest> {
        self.pools.get(pool_id).and_then(|r| r.request.as_ref())
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }
}

impl<C: Coprocessor + ?Sized, E: EventSink> HostCallbacks for ConfidentialLiquidityHook<C, E> {
    fn on_pool_initialized(&mut self, ctx: &CallContext, key: &PoolKey) -> HookResult<PoolId> {
        key.validate()?;
        let pool_id = key.to_id();
        self.initialize_pool(pool_id, ctx.origin)?;
        Ok(pool_id)
    }

    fn on_liquidity_will_change(&mut self, pool_id: &PoolId, signed_delta: i128) -> HookResult<()> {
        let record = self.record(pool_id)?;
        let Some(delta) = LiquidityDelta::from_signed(signed_delta)? else {
            return Ok(());
        };

        let accumulator = tracker::track(
            &self.transaction(),
            &record.accumulator,
            self.config.tracking,
            delta,
        )
        .map_err(|e| {
            if e.is_fatal() {
                warn!(pool = %pool_id.short(), error = %e, "Accumulator update rejected by ACL");
            }
            e
        })?;

        if let Some(record) = self.pools.get_mut(pool_id) {
            record.accumulator = accumulator;
        }
        let is_addition = delta.direction.is_addition();
        debug!(pool = %pool_id.short(), is_addition, "Liquidity delta tracked");
        self.events.emit(HookEvent::LiquidityTracked {
            pool_id: *pool_id,
            is_addition,
        });
        Ok(())
    }
}
