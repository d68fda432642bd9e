//! Pool identity
//!
//! The host engine names pools by their static parameters. A [`PoolId`] is
//! the blake3 hash of the canonical encoding of a [`PoolKey`], so the same
//! parameters always map to the same id.

use std::fmt;
use std::str::FromStr;

use cloak_fhe::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{HookError, HookResult};

/// Highest static LP fee, in hundredths of a basis point (100%)
pub const MAX_LP_FEE: u32 = 1_000_000;

/// Fee value marking a pool with a dynamic fee
pub const DYNAMIC_FEE_FLAG: u32 = 0x80_0000;

/// Tick spacing bounds accepted by the host
pub const MIN_TICK_SPACING: i32 = 1;
pub const MAX_TICK_SPACING: i32 = i16::MAX as i32;

const POOL_ID_DOMAIN: &[u8] = b"cloak-pool-id-v1";

/// Content-derived pool identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId([u8; 32]);

impl PoolId {
    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short hex prefix for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl From<[u8; 32]> for PoolId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolId({}..)", self.short())
    }
}

impl FromStr for PoolId {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|e| HookError::InvalidPoolKey(format!("invalid pool id {s}: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| HookError::InvalidPoolKey("pool id must be 32 bytes".to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for PoolId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PoolId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Static parameters of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolKey {
    /// Lower-sorted currency
    pub currency0: Address,
    /// Higher-sorted currency
    pub currency1: Address,
    /// LP fee in hundredths of a basis point, or [`DYNAMIC_FEE_FLAG`]
    pub fee: u32,
    /// Tick spacing
    pub tick_spacing: i32,
    /// Hook contract attached to the pool
    pub hooks: Address,
}

impl PoolKey {
    /// Create a validated pool key
    pub fn new(
        currency0: Address,
        currency1: Address,
        fee: u32,
        tick_spacing: i32,
        hooks: Address,
    ) -> HookResult<Self> {
        let key = Self {
            currency0,
            currency1,
            fee,
            tick_spacing,
            hooks,
        };
        key.validate()?;
        Ok(key)
    }

    /// Check the host's pool key rules
    pub fn validate(&self) -> HookResult<()> {
        if self.currency0 >= self.currency1 {
            return Err(HookError::InvalidPoolKey(format!(
                "currencies out of order: {} >= {}",
                self.currency0, self.currency1
            )));
        }
        if self.fee > MAX_LP_FEE && self.fee != DYNAMIC_FEE_FLAG {
            return Err(HookError::InvalidPoolKey(format!("fee {} too large", self.fee)));
        }
        if !(MIN_TICK_SPACING..=MAX_TICK_SPACING).contains(&self.tick_spacing) {
            return Err(HookError::InvalidPoolKey(format!(
                "tick spacing {} out of range",
                self.tick_spacing
            )));
        }
        Ok(())
    }

    /// Whether the pool uses a dynamic fee
    pub fn is_dynamic_fee(&self) -> bool {
        self.fee == DYNAMIC_FEE_FLAG
    }

    /// Derive the pool id
    pub fn to_id(&self) -> PoolId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(POOL_ID_DOMAIN);
        hasher.update(self.currency0.as_bytes());
        hasher.update(self.currency1.as_bytes());
        hasher.update(&self.fee.to_be_bytes());
        hasher.update(&self.tick_spacing.to_be_bytes());
        hasher.update(self.hooks.as_bytes());
        PoolId(*hasher.finalize().as_bytes())
    }
}

/// Parameters of a liquidity modification, as passed by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyLiquidityParams {
    pub tick_lower: i32,
    pub tick_upper: i32,
    /// Positive to add liquidity, negative to remove
    pub liquidity_delta: i128,
    #[serde(default)]
    pub salt: [u8; 32],
}

impl ModifyLiquidityParams {
    pub fn new(tick_lower: i32, tick_upper: i32, liquidity_delta: i128) -> Self {
        Self {
            tick_lower,
            tick_upper,
            liquidity_delta,
            salt: [0u8; 32],
        }
    }
}
