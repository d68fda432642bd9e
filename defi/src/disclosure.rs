//! Two-phase disclosure protocol
//!
//! ```text
//!   NoRequest ──request──▶ Pending ──oracle publishes──▶ Ready
//!       ▲                     │                            │
//!       └────────reset────────┴────────────reset───────────┘
//! ```
//!
//! Only `NoRequest` and the request record are stored. `Pending` versus
//! `Ready` is decided by polling the oracle each time, so a poll never
//! mutates anything and may be repeated without limit.

use cloak_fhe::{Address, CiphertextHandle, Coprocessor, TransactionScope};
use serde::{Deserialize, Serialize};

use crate::accumulator::EncryptedAccumulator;
use crate::errors::{HookError, HookResult};

/// Outstanding disclosure of one pool's accumulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionRequest {
    /// token0 total captured at request time
    token0_handle: CiphertextHandle,
    /// token1 total captured at request time
    token1_handle: CiphertextHandle,
    requester: Address,
    /// Monotonic per-hook request number
    sequence: u64,
}

impl DecryptionRequest {
    /// Capture the accumulator's current handles and submit both to the oracle.
    ///
    /// Nothing is returned unless both submissions were accepted.
    pub fn submit<C: Coprocessor + ?Sized>(
        scope: &TransactionScope<C>,
        accumulator: &EncryptedAccumulator,
        requester: Address,
        sequence: u64,
    ) -> HookResult<Self> {
        let (token0_handle, token1_handle) = accumulator.handles();
        scope.submit_decryption(&token0_handle)?;
        scope.submit_decryption(&token1_handle)?;

        Ok(Self {
            token0_handle,
            token1_handle,
            requester,
            sequence,
        })
    }

    pub fn handles(&self) -> (CiphertextHandle, CiphertextHandle) {
        (self.token0_handle, self.token1_handle)
    }

    pub fn requester(&self) -> &Address {
        &self.requester
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Whether the oracle has published both plaintexts
    pub fn is_ready<C: Coprocessor + ?Sized>(&self, coprocessor: &C) -> bool {
        coprocessor.poll_decryption(&self.token0_handle).ready
            && coprocessor.poll_decryption(&self.token1_handle).ready
    }
}

/// Observable disclosure state of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisclosureState {
    NoRequest,
    Pending,
    Ready,
}

impl DisclosureState {
    pub fn of<C: Coprocessor + ?Sized>(coprocessor: &C, request: Option<&DecryptionRequest>) -> Self {
        match request {
            None => DisclosureState::NoRequest,
            Some(r) if r.is_ready(coprocessor) => DisclosureState::Ready,
            Some(_) => DisclosureState::Pending,
        }
    }
}

/// `(requested, ready)` poll. Infallible.
pub fn readiness<C: Coprocessor + ?Sized>(
    coprocessor: &C,
    request: Option<&DecryptionRequest>,
) -> (bool, bool) {
    match request {
        None => (false, false),
        Some(r) => (true, r.is_ready(coprocessor)),
    }
}

/// Strict retrieval of both plaintext totals
pub fn retrieve<C: Coprocessor + ?Sized>(
    coprocessor: &C,
    request: Option<&DecryptionRequest>,
) -> HookResult<(u64, u64)> {
    let request = request.ok_or(HookError::NotRequested)?;
    let total0 = coprocessor.poll_decryption(&request.token0_handle).value();
    let total1 = coprocessor.poll_decryption(&request.token1_handle).value();

    match (total0, total1) {
        (Some(total0), Some(total1)) => Ok((total0, total1)),
        _ => Err(HookError::NotReady),
    }
}
