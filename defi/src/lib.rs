//! CLOAK Confidential Liquidity Hook
//!
//! AMM hook that keeps an encrypted running total of liquidity per pool and
//! lets the pool owner, and only the owner, disclose that total through an
//! asynchronous decryption oracle.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Host AMM callbacks                      │
//! │        on_pool_initialized        on_modify_liquidity       │
//! └──────────────┬───────────────────────────┬──────────────────┘
//!                ▼                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │               ConfidentialLiquidityHook                     │
//! │  OwnerRegistry │ EncryptedAccumulator │ DecryptionRequest   │
//! └──────────────┬───────────────────────────┬──────────────────┘
//!                ▼                           ▼
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │  Coprocessor (handles,   │   │  DecryptionOracle            │
//! │  ACL, add/sub)           │◀──│  (publishes plaintexts)      │
//! └──────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! Owner entry points: `request_decryption`, `is_decryption_ready`,
//! `get_decrypted_metrics` and `reset_tracking`.

pub mod accumulator;
pub mod disclosure;
pub mod errors;
pub mod events;
pub mod guard;
pub mod hook;
pub mod pool;
pub mod tracker;

// Re-export main types
pub use accumulator::{EncryptedAccumulator, TrackingMode};
pub use disclosure::{DecryptionRequest, DisclosureState};
pub use errors::{HookError, HookResult};
pub use events::{EventLog, EventSink, HookEvent};
pub use guard::OwnerRegistry;
pub use hook::{CallContext, ConfidentialLiquidityHook, HookConfig, HostCallbacks, DEFAULT_HOOK_ADDRESS};
pub use pool::{ModifyLiquidityParams, PoolId, PoolKey};
pub use tracker::{Direction, LiquidityDelta};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::accumulator::TrackingMode;
    pub use crate::disclosure::DisclosureState;
    pub use crate::errors::{HookError, HookResult};
    pub use crate::events::{EventLog, EventSink, HookEvent};
    pub use crate::hook::{CallContext, ConfidentialLiquidityHook, HookConfig, HostCallbacks};
    pub use crate::pool::{ModifyLiquidityParams, PoolId, PoolKey};
}
