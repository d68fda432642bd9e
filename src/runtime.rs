//! CLOAK Runtime
//!
//! Wires one [`ConfidentialLiquidityHook`] to an in-process coprocessor, its
//! decryption oracle and a broadcast event stream.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CloakRuntime                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  host callbacks / owner calls                               │
//! │              │                                              │
//! │     ┌────────▼─────────┐        ┌──────────────────┐        │
//! │     │  Hook (Mutex)    │──emit─▶│ broadcast events │        │
//! │     └────────┬─────────┘        └──────────────────┘        │
//! │              │                                              │
//! │     ┌────────▼─────────┐        ┌──────────────────┐        │
//! │     │  FheCoprocessor  │◀──────▶│ Oracle worker    │        │
//! │     └──────────────────┘        └──────────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use cloak_defi::{
    CallContext, ConfidentialLiquidityHook, DisclosureState, EncryptedAccumulator, HookConfig,
    HookError, HookEvent, HostCallbacks, ModifyLiquidityParams, PoolId, PoolKey,
};
use cloak_fhe::{Address, CiphertextBackend, ClearBackend, DecryptionOracle, FHEError, FheCoprocessor, OracleConfig};

/// Errors during runtime operation
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Hook error: {0}")]
    Hook(#[from] HookError),
    #[error("Coprocessor error: {0}")]
    Coprocessor(#[from] FHEError),
    #[error("Oracle worker already running")]
    AlreadyRunning,
    #[error("No tokio runtime available for the oracle worker")]
    NoAsyncRuntime,
    #[error("Disclosure not ready after {0:?}")]
    Timeout(Duration),
    #[error("Oracle task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Runtime configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub hook: HookConfig,
    pub oracle: OracleConfig,
    /// Capacity of the broadcast event channel
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            hook: HookConfig::default(),
            oracle: OracleConfig::default(),
            event_capacity: crate::config::DEFAULT_EVENT_CAPACITY,
        }
    }
}

type Hook<B> = ConfidentialLiquidityHook<FheCoprocessor<B>, broadcast::Sender<HookEvent>>;

/// A running confidential liquidity hook
pub struct CloakRuntime<B: CiphertextBackend> {
    hook: Mutex<Hook<B>>,
    coprocessor: Arc<FheCoprocessor<B>>,
    oracle: Arc<DecryptionOracle<B>>,
    events: broadcast::Sender<HookEvent>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CloakRuntime<ClearBackend> {
    /// Runtime over the plaintext simulation backend
    pub fn clear(config: RuntimeConfig) -> Self {
        Self::new(ClearBackend, config)
    }
}

#[cfg(feature = "tfhe")]
impl CloakRuntime<cloak_fhe::TfheBackend> {
    /// Runtime over TFHE ciphertexts. Key generation is slow.
    pub fn tfhe(fhe: &cloak_fhe::FHEConfig, config: RuntimeConfig) -> RuntimeResult<Self> {
        let backend = cloak_fhe::TfheBackend::new(fhe)?;
        Ok(Self::new(backend, config))
    }
}

impl<B: CiphertextBackend> CloakRuntime<B> {
    pub fn new(backend: B, config: RuntimeConfig) -> Self {
        let coprocessor = Arc::new(FheCoprocessor::new(backend));
        let oracle = Arc::new(DecryptionOracle::new(Arc::clone(&coprocessor), config.oracle));
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let hook = ConfidentialLiquidityHook::new(config.hook, Arc::clone(&coprocessor), events.clone());

        info!(backend = coprocessor.backend().name(), "CLOAK runtime created");
        Self {
            hook: Mutex::new(hook),
            coprocessor,
            oracle,
            events,
            worker: Mutex::new(None),
        }
    }

    pub fn coprocessor(&self) -> &Arc<FheCoprocessor<B>> {
        &self.coprocessor
    }

    pub fn hook_config(&self) -> HookConfig {
        self.hook.lock().config().clone()
    }

    /// Subscribe to hook events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<HookEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // ORACLE
    // =========================================================================

    /// Start the background oracle worker on the current tokio runtime
    pub fn start_oracle(&self) -> RuntimeResult<()> {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|w| !w.is_finished()) {
            return Err(RuntimeError::AlreadyRunning);
        }
        tokio::runtime::Handle::try_current().map_err(|_| RuntimeError::NoAsyncRuntime)?;

        *worker = Some(Arc::clone(&self.oracle).spawn());
        Ok(())
    }

    /// Stop the background oracle worker. Queued requests stay queued.
    pub fn stop_oracle(&self) {
        if let Some(worker) = self.worker.lock().take() {
            worker.abort();
            info!("Decryption oracle stopped");
        }
    }

    pub fn is_oracle_running(&self) -> bool {
        self.worker.lock().as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Fulfil every queued decryption synchronously
    pub fn fulfill_now(&self) -> usize {
        self.oracle.fulfill_all()
    }

    /// Fulfil every queued decryption on the blocking pool.
    /// Use this instead of [`Self::fulfill_now`] from async code.
    pub async fn fulfill_blocking(&self) -> RuntimeResult<usize> {
        let oracle = Arc::clone(&self.oracle);
        Ok(tokio::task::spawn_blocking(move || oracle.fulfill_all()).await?)
    }

    /// Poll until the pool's disclosure is ready, then retrieve it
    pub async fn wait_for_disclosure(&self, pool_id: &PoolId, timeout: Duration) -> RuntimeResult<(u64, u64)> {
        let poll_every = self.oracle.config().fulfil_interval() / 2;
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match self.is_decryption_ready(pool_id) {
                (false, _) => return Err(HookError::NotRequested.into()),
                (true, true) => return Ok(self.get_decrypted_metrics(pool_id)?),
                (true, false) => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(RuntimeError::Timeout(timeout));
            }
            tokio::time::sleep(poll_every.max(Duration::from_millis(1))).await;
        }
    }

    // =========================================================================
    // HOST CALLBACKS
    // =========================================================================

    pub fn initialize_pool(&self, ctx: &CallContext, key: &PoolKey) -> RuntimeResult<PoolId> {
        Ok(self.hook.lock().on_pool_initialized(ctx, key)?)
    }

    pub fn modify_liquidity(
        &self,
        ctx: &CallContext,
        key: &PoolKey,
        params: &ModifyLiquidityParams,
    ) -> RuntimeResult<()> {
        Ok(self.hook.lock().on_modify_liquidity(ctx, key, params)?)
    }

    pub fn liquidity_will_change(&self, pool_id: &PoolId, signed_delta: i128) -> RuntimeResult<()> {
        Ok(self.hook.lock().on_liquidity_will_change(pool_id, signed_delta)?)
    }

    // =========================================================================
    // OWNER ENTRY POINTS
    // =========================================================================

    pub fn request_decryption(&self, pool_id: &PoolId, caller: &Address) -> RuntimeResult<()> {
        self.hook.lock().request_decryption(pool_id, caller)?;
        debug!(pool = %pool_id.short(), queued = self.coprocessor.pending_decryptions(), "Disclosure queued");
        Ok(())
    }

    pub fn is_decryption_ready(&self, pool_id: &PoolId) -> (bool, bool) {
        self.hook.lock().is_decryption_ready(pool_id)
    }

    pub fn get_decrypted_metrics(&self, pool_id: &PoolId) -> RuntimeResult<(u64, u64)> {
        Ok(self.hook.lock().get_decrypted_metrics(pool_id)?)
    }

    pub fn reset_tracking(&self, pool_id: &PoolId, caller: &Address) -> RuntimeResult<()> {
        Ok(self.hook.lock().reset_tracking(pool_id, caller)?)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn disclosure_state(&self, pool_id: &PoolId) -> DisclosureState {
        self.hook.lock().disclosure_state(pool_id)
    }

    pub fn owner_of(&self, pool_id: &PoolId) -> Option<Address> {
        self.hook.lock().owner_of(pool_id)
    }

    pub fn accumulator(&self, pool_id: &PoolId) -> Option<EncryptedAccumulator> {
        self.hook.lock().accumulator(pool_id).copied()
    }

    pub fn pool_count(&self) -> usize {
        self.hook.lock().pool_count()
    }
}

impl<B: CiphertextBackend> Drop for CloakRuntime<B> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Address = Address::repeat_byte(0xa1);
    const ROUTER: Address = Address::repeat_byte(0x0e);

    fn pool_key() -> PoolKey {
        PoolKey::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            3000,
            60,
            cloak_defi::DEFAULT_HOOK_ADDRESS,
        )
        .unwrap()
    }

    fn fast_config() -> RuntimeConfig {
        RuntimeConfig {
            oracle: OracleConfig {
                fulfil_interval_ms: 5,
                batch_size: 8,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_runtime_config_default() {
        let config = RuntimeConfig::default();
        assert_eq!(config.event_capacity, 1024);
        assert_eq!(config.oracle.batch_size, 16);
    }

    #[test]
    fn test_synchronous_disclosure() {
        let runtime = CloakRuntime::clear(RuntimeConfig::default());
        let pool_id = runtime
            .initialize_pool(&CallContext::new(ROUTER, OWNER), &pool_key())
            .unwrap();
        runtime
            .modify_liquidity(&CallContext::new(ROUTER, OWNER), &pool_key(), &ModifyLiquidityParams::new(-60, 60, 400))
            .unwrap();
        runtime.request_decryption(&pool_id, &OWNER).unwrap();

        assert_eq!(runtime.disclosure_state(&pool_id), DisclosureState::Pending);
        assert_eq!(runtime.fulfill_now(), 2);
        assert_eq!(runtime.get_decrypted_metrics(&pool_id).unwrap(), (400, 0));
    }

    #[test]
    fn test_oracle_requires_async_runtime() {
        let runtime = CloakRuntime::clear(RuntimeConfig::default());
        assert!(matches!(runtime.start_oracle(), Err(RuntimeError::NoAsyncRuntime)));
        assert!(!runtime.is_oracle_running());
    }

    #[test]
    fn test_hook_errors_are_wrapped() {
        let runtime = CloakRuntime::clear(RuntimeConfig::default());
        let err = runtime.get_decrypted_metrics(&pool_key().to_id()).unwrap_err();
        assert!(matches!(err, RuntimeError::Hook(HookError::PoolNotFound(_))));
    }

    #[tokio::test]
    async fn test_background_oracle_disclosure() {
        let runtime = CloakRuntime::clear(fast_config());
        let mut events = runtime.subscribe();
        runtime.start_oracle().unwrap();
        assert!(matches!(runtime.start_oracle(), Err(RuntimeError::AlreadyRunning)));

        let pool_id = runtime
            .initialize_pool(&CallContext::new(ROUTER, OWNER), &pool_key())
            .unwrap();
        runtime.liquidity_will_change(&pool_id, 1000).unwrap();
        runtime.liquidity_will_change(&pool_id, -500).unwrap();
        runtime.liquidity_will_change(&pool_id, 250).unwrap();
        runtime.request_decryption(&pool_id, &OWNER).unwrap();

        let totals = runtime
            .wait_for_disclosure(&pool_id, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(totals, (750, 0));

        assert_eq!(
            events.recv().await.unwrap(),
            HookEvent::LiquidityTracked { pool_id, is_addition: true }
        );

        runtime.stop_oracle();
        assert!(!runtime.is_oracle_running());
    }

    #[tokio::test]
    async fn test_fulfill_blocking_from_async() {
        let runtime = CloakRuntime::clear(fast_config());
        let pool_id = runtime
            .initialize_pool(&CallContext::new(ROUTER, OWNER), &pool_key())
            .unwrap();
        runtime.liquidity_will_change(&pool_id, 64).unwrap();
        runtime.request_decryption(&pool_id, &OWNER).unwrap();

        assert_eq!(runtime.fulfill_blocking().await.unwrap(), 2);
        assert_eq!(runtime.get_decrypted_metrics(&pool_id).unwrap(), (64, 0));
        assert_eq!(runtime.fulfill_blocking().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_wait_without_request() {
        let runtime = CloakRuntime::clear(fast_config());
        let pool_id = runtime
            .initialize_pool(&CallContext::new(ROUTER, OWNER), &pool_key())
            .unwrap();
        let err = runtime
            .wait_for_disclosure(&pool_id, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Hook(HookError::NotRequested)));
    }

    #[tokio::test]
    async fn test_wait_times_out_without_oracle() {
        let runtime = CloakRuntime::clear(fast_config());
        let pool_id = runtime
            .initialize_pool(&CallContext::new(ROUTER, OWNER), &pool_key())
            .unwrap();
        runtime.request_decryption(&pool_id, &OWNER).unwrap();

        let err = runtime
            .wait_for_disclosure(&pool_id, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Timeout(_)));
    }
}
