//! Encrypted running totals
//!
//! Every handle written into an accumulator is granted persistent compute
//! rights in the same step that produced it. A handle that misses the grant
//! would be unusable once the transaction ends.

use cloak_fhe::{CiphertextHandle, Coprocessor, TransactionScope};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::errors::HookResult;

/// Which sides of the pool receive liquidity deltas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// Only `token0_total` moves; `token1_total` stays at encrypted zero
    #[default]
    Token0Only,
    /// Both totals receive every delta
    Symmetric,
}

impl TrackingMode {
    pub fn tracks_token1(&self) -> bool {
        matches!(self, TrackingMode::Symmetric)
    }
}

/// Pair of encrypted per-pool totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedAccumulator {
    token0_total: CiphertextHandle,
    token1_total: CiphertextHandle,
}

impl EncryptedAccumulator {
    /// Fresh accumulator holding two encrypted zeros
    pub fn zero<C: Coprocessor + ?Sized>(scope: &TransactionScope<C>) -> HookResult<Self> {
        let token0_total = scope.encrypt_zero()?;
        scope.grant_compute_rights(&token0_total)?;
        let token1_total = scope.encrypt_zero()?;
        scope.grant_compute_rights(&token1_total)?;

        Ok(Self {
            token0_total,
            token1_total,
        })
    }

    pub fn token0_total(&self) -> &CiphertextHandle {
        &self.token0_total
    }

    pub fn token1_total(&self) -> &CiphertextHandle {
        &self.token1_total
    }

    /// Both handles, token0 first
    pub fn handles(&self) -> (CiphertextHandle, CiphertextHandle) {
        (self.token0_total, self.token1_total)
    }

    /// Add or subtract an encrypted magnitude, returning the updated totals.
    ///
    /// `self` is left untouched so a failure midway changes nothing.
    pub fn apply<C: Coprocessor + ?Sized>(
        &self,
        scope: &TransactionScope<C>,
        mode: TrackingMode,
        magnitude: &CiphertextHandle,
        is_addition: bool,
    ) -> HookResult<Self> {
        let token0_total = combine(scope, &self.token0_total, magnitude, is_addition)?;
        let token1_total = if mode.tracks_token1() {
            combine(scope, &self.token1_total, magnitude, is_addition)?
        } else {
            self.token1_total
        };

        Ok(Self {
            token0_total,
            token1_total,
        })
    }
}

fn combine<C: Coprocessor + ?Sized>(
    scope: &TransactionScope<C>,
    total: &CiphertextHandle,
    magnitude: &CiphertextHandle,
    is_addition: bool,
) -> HookResult<CiphertextHandle> {
    let next = if is_addition {
        scope.add(total, magnitude)?
    } else {
        scope.sub(total, magnitude)?
    };
    scope.grant_compute_rights(&next)?;
    trace!(from = %total.short(), to = %next.short(), "Accumulator total replaced");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloak_fhe::{Address, ClearBackend, DecryptionOracle, FheCoprocessor, OracleConfig};
    use std::sync::Arc;

    const HOOK: Address = Address::repeat_byte(0xc0);

    fn reveal(cop: &Arc<FheCoprocessor<ClearBackend>>, handle: &CiphertextHandle) -> u64 {
        cop.submit_decryption(&HOOK, handle).unwrap();
        DecryptionOracle::new(Arc::clone(cop), OracleConfig::default()).fulfill_all();
        cop.poll_decryption(handle).value().unwrap()
    }

    #[test]
    fn test_zero_accumulator_is_granted() {
        let cop = Arc::new(FheCoprocessor::new(ClearBackend));
        let acc = EncryptedAccumulator::zero(&TransactionScope::begin(&cop, HOOK)).unwrap();

        assert!(cop.is_allowed(acc.token0_total(), &HOOK));
        assert!(cop.is_allowed(acc.token1_total(), &HOOK));
        assert_ne!(acc.token0_total(), acc.token1_total());
        assert_eq!(reveal(&cop, acc.token0_total()), 0);
    }

    #[test]
    fn test_token0_only_leaves_token1_untouched() {
        let cop = Arc::new(FheCoprocessor::new(ClearBackend));
        let scope = TransactionScope::begin(&cop, HOOK);
        let acc = EncryptedAccumulator::zero(&scope).unwrap();
        let m = scope.encrypt_magnitude(10).unwrap();

        let next = acc.apply(&scope, TrackingMode::Token0Only, &m, true).unwrap();
        assert_ne!(next.token0_total(), acc.token0_total());
        assert_eq!(next.token1_total(), acc.token1_total());
        drop(scope);

        assert_eq!(reveal(&cop, next.token0_total()), 10);
        assert_eq!(reveal(&cop, next.token1_total()), 0);
    }

    #[test]
    fn test_symmetric_moves_both_sides() {
        let cop = Arc::new(FheCoprocessor::new(ClearBackend));
        let scope = TransactionScope::begin(&cop, HOOK);
        let acc = EncryptedAccumulator::zero(&scope).unwrap();
        let add = scope.encrypt_magnitude(30).unwrap();
        let remove = scope.encrypt_magnitude(12).unwrap();

        let acc = acc.apply(&scope, TrackingMode::Symmetric, &add, true).unwrap();
        let acc = acc.apply(&scope, TrackingMode::Symmetric, &remove, false).unwrap();
        drop(scope);

        // Totals survive the end of the transaction because they were granted
        assert_eq!(reveal(&cop, acc.token0_total()), 18);
        assert_eq!(reveal(&cop, acc.token1_total()), 18);
    }
}
