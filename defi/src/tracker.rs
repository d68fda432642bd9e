//! Liquidity delta tracking
//!
//! Turns the host's signed liquidity delta into an encrypted magnitude and
//! folds it into the pool's accumulator. The delta itself is public; only the
//! cumulative total is confidential.

use cloak_fhe::{Coprocessor, TransactionScope};
use serde::{Deserialize, Serialize};

use crate::accumulator::{EncryptedAccumulator, TrackingMode};
use crate::errors::{HookError, HookResult};

/// Direction of a liquidity change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Addition,
    Removal,
}

impl Direction {
    pub fn is_addition(&self) -> bool {
        matches!(self, Direction::Addition)
    }
}

/// Non-zero liquidity change within the coprocessor's 64-bit domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityDelta {
    pub magnitude: u64,
    pub direction: Direction,
}

impl LiquidityDelta {
    /// Classify a signed delta. Zero yields `None`.
    pub fn from_signed(signed_delta: i128) -> HookResult<Option<Self>> {
        if signed_delta == 0 {
            return Ok(None);
        }
        let magnitude = u64::try_from(signed_delta.unsigned_abs())
            .map_err(|_| HookError::DeltaOutOfRange(signed_delta))?;
        let direction = if signed_delta > 0 {
            Direction::Addition
        } else {
            Direction::Removal
        };
        Ok(Some(Self {
            magnitude,
            direction,
        }))
    }
}

/// Fold `delta` into `accumulator`, returning the new accumulator
pub fn track<C: Coprocessor + ?Sized>(
    scope: &TransactionScope<C>,
    accumulator: &EncryptedAccumulator,
    mode: TrackingMode,
    delta: LiquidityDelta,
) -> HookResult<EncryptedAccumulator> {
    // Intermediate value: transiently allowed only, expires with the scope
    let magnitude = scope.encrypt_magnitude(delta.magnitude)?;
    accumulator.apply(scope, mode, &magnitude, delta.direction.is_addition())
}
