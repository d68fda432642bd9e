//! Encryption coprocessor
//!
//! The coprocessor owns every ciphertext and hands out [`CiphertextHandle`]s.
//! Callers act as a principal ([`Address`]); each operation checks the ACL for
//! every operand handle. Fresh handles are transiently allowed for the
//! principal that produced them until [`Coprocessor::end_transaction`].
//!
//! Decryption is asynchronous: [`Coprocessor::submit_decryption`] queues a
//! handle, the [`DecryptionOracle`](crate::DecryptionOracle) fulfils the queue
//! later and [`Coprocessor::poll_decryption`] observes the result.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::acl::AccessControlList;
use crate::address::Address;
use crate::backend::CiphertextBackend;
use crate::errors::FHEError;
use crate::handle::{CiphertextHandle, HandleOp};
use crate::FHEResult;

/// Outcome of polling a submitted decryption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecryptionPoll {
    /// Plaintext, meaningful only when `ready`
    pub value: u64,
    /// Whether the oracle has published a result
    pub ready: bool,
}

impl DecryptionPoll {
    pub const PENDING: DecryptionPoll = DecryptionPoll { value: 0, ready: false };

    /// The plaintext if the result is ready
    pub fn value(&self) -> Option<u64> {
        self.ready.then_some(self.value)
    }
}

/// Operations the encryption coprocessor exposes to its callers
pub trait Coprocessor: Send + Sync {
    /// Encrypt zero
    fn encrypt_zero(&self, caller: &Address) -> FHEResult<CiphertextHandle> {
        self.encrypt_magnitude(caller, 0)
    }

    /// Encrypt a public 64-bit magnitude
    fn encrypt_magnitude(&self, caller: &Address, value: u64) -> FHEResult<CiphertextHandle>;

    /// `lhs + rhs`, wrapping modulo 2^64
    fn add(
        &self,
        caller: &Address,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> FHEResult<CiphertextHandle>;

    /// `lhs - rhs`, wrapping modulo 2^64
    fn sub(
        &self,
        caller: &Address,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> FHEResult<CiphertextHandle>;

    /// Grant `caller` persistent compute rights on `handle`.
    /// The caller must already be allowed to use it.
    fn grant_compute_rights(&self, caller: &Address, handle: &CiphertextHandle) -> FHEResult<()>;

    /// Queue `handle` for decryption. Fire-and-forget.
    fn submit_decryption(&self, caller: &Address, handle: &CiphertextHandle) -> FHEResult<()>;

    /// Non-destructive, repeatable poll of a decryption result
    fn poll_decryption(&self, handle: &CiphertextHandle) -> DecryptionPoll;

    /// Whether `principal` may currently use `handle`
    fn is_allowed(&self, handle: &CiphertextHandle, principal: &Address) -> bool;

    /// End `caller`'s transaction, revoking its transient allowances
    fn end_transaction(&self, caller: &Address);
}

/// A principal's transaction against a coprocessor.
///
/// Dropping the scope ends the transaction, so handles that were not granted
/// persistent rights inside the scope become unusable afterwards.
pub struct TransactionScope<C: Coprocessor + ?Sized> {
    coprocessor: Arc<C>,
    principal: Address,
}

impl<C: Coprocessor + ?Sized> TransactionScope<C> {
    /// Begin a transaction for `principal`
    pub fn begin(coprocessor: &Arc<C>, principal: Address) -> Self {
        Self {
            coprocessor: Arc::clone(coprocessor),
            principal,
        }
    }

    pub fn principal(&self) -> &Address {
        &self.principal
    }

    pub fn encrypt_zero(&self) -> FHEResult<CiphertextHandle> {
        self.coprocessor.encrypt_zero(&self.principal)
    }

    pub fn encrypt_magnitude(&self, value: u64) -> FHEResult<CiphertextHandle> {
        self.coprocessor.encrypt_magnitude(&self.principal, value)
    }

    pub fn add(&self, lhs: &CiphertextHandle, rhs: &CiphertextHandle) -> FHEResult<CiphertextHandle> {
        self.coprocessor.add(&self.principal, lhs, rhs)
    }

    pub fn sub(&self, lhs: &CiphertextHandle, rhs: &CiphertextHandle) -> FHEResult<CiphertextHandle> {
        self.coprocessor.sub(&self.principal, lhs, rhs)
    }

    pub fn grant_compute_rights(&self, handle: &CiphertextHandle) -> FHEResult<()> {
        self.coprocessor.grant_compute_rights(&self.principal, handle)
    }

    pub fn submit_decryption(&self, handle: &CiphertextHandle) -> FHEResult<()> {
        self.coprocessor.submit_decryption(&self.principal, handle)
    }
}

impl<C: Coprocessor + ?Sized> Drop for TransactionScope<C> {
    fn drop(&mut self) {
        self.coprocessor.end_transaction(&self.principal);
    }
}

struct CoprocessorState<T> {
    ciphertexts: HashMap<CiphertextHandle, T>,
    acl: AccessControlList,
    /// Handles waiting for the oracle, in submission order
    queue: VecDeque<CiphertextHandle>,
    /// Every handle ever submitted; deduplicates resubmissions and keeps
    /// orphaned ciphertexts alive until their result is published
    submitted: HashSet<CiphertextHandle>,
    /// Published plaintexts; never removed
    results: HashMap<CiphertextHandle, u64>,
}

impl<T> Default for CoprocessorState<T> {
    fn default() -> Self {
        Self {
            ciphertexts: HashMap::new(),
            acl: AccessControlList::new(),
            queue: VecDeque::new(),
            submitted: HashSet::new(),
            results: HashMap::new(),
        }
    }
}

/// In-process coprocessor over a [`CiphertextBackend`]
pub struct FheCoprocessor<B: CiphertextBackend> {
    backend: B,
    state: RwLock<CoprocessorState<B::Ciphertext>>,
    nonce: AtomicU64,
}

impl<B: CiphertextBackend> FheCoprocessor<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: RwLock::new(CoprocessorState::default()),
            nonce: AtomicU64::new(0),
        }
    }

    /// Backend used for the cryptography
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of stored ciphertexts
    pub fn ciphertext_count(&self) -> usize {
        self.state.read().ciphertexts.len()
    }

    /// Number of decryptions waiting for the oracle
    pub fn pending_decryptions(&self) -> usize {
        self.state.read().queue.len()
    }

    fn store(
        &self,
        caller: &Address,
        op: HandleOp,
        operands: &[&CiphertextHandle],
        ciphertext: B::Ciphertext,
    ) -> CiphertextHandle {
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        let handle = CiphertextHandle::derive(op, operands, nonce);

        let mut state = self.state.write();
        state.ciphertexts.insert(handle, ciphertext);
        state.acl.allow_transient(handle, *caller);
        trace!(handle = %handle.short(), op = ?op, "Stored ciphertext");
        handle
    }

    fn operands(
        &self,
        caller: &Address,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> FHEResult<(B::Ciphertext, B::Ciphertext)> {
        let state = self.state.read();
        state.acl.require(lhs, caller)?;
        state.acl.require(rhs, caller)?;
        let a = state
            .ciphertexts
            .get(lhs)
            .ok_or(FHEError::UnknownHandle(*lhs))?
            .clone();
        let b = state
            .ciphertexts
            .get(rhs)
            .ok_or(FHEError::UnknownHandle(*rhs))?
            .clone();
        Ok((a, b))
    }

    /// Pop up to `max` queued decryptions for the oracle
    pub(crate) fn take_pending(&self, max: usize) -> Vec<(CiphertextHandle, B::Ciphertext)> {
        let mut state = self.state.write();
        let mut batch = Vec::with_capacity(max.min(state.queue.len()));
        while batch.len() < max {
            let Some(handle) = state.queue.pop_front() else {
                break;
            };
            if let Some(ct) = state.ciphertexts.get(&handle) {
                batch.push((handle, ct.clone()));
            }
        }
        batch
    }

    /// Publish an oracle result. The first published value wins.
    pub(crate) fn publish(&self, handle: CiphertextHandle, value: u64) {
        let mut state = self.state.write();
        state.results.entry(handle).or_insert(value);
        // Kept alive only for the oracle
        if !state.acl.has_any_grant(&handle) {
            state.ciphertexts.remove(&handle);
        }
    }

    /// Put a handle back at the end of the queue after a failed decryption
    pub(crate) fn requeue(&self, handle: CiphertextHandle) {
        self.state.write().queue.push_back(handle);
    }
}

impl<B: CiphertextBackend> Coprocessor for FheCoprocessor<B> {
    fn encrypt_magnitude(&self, caller: &Address, value: u64) -> FHEResult<CiphertextHandle> {
        let ciphertext = self.backend.encrypt(value)?;
        Ok(self.store(caller, HandleOp::Encrypt, &[], ciphertext))
    }

    fn add(
        &self,
        caller: &Address,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> FHEResult<CiphertextHandle> {
        let (a, b) = self.operands(caller, lhs, rhs)?;
        let sum = self.backend.add(&a, &b)?;
        Ok(self.store(caller, HandleOp::Add, &[lhs, rhs], sum))
    }

    fn sub(
        &self,
        caller: &Address,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> FHEResult<CiphertextHandle> {
        let (a, b) = self.operands(caller, lhs, rhs)?;
        let difference = self.backend.sub(&a, &b)?;
        Ok(self.store(caller, HandleOp::Sub, &[lhs, rhs], difference))
    }

    fn grant_compute_rights(&self, caller: &Address, handle: &CiphertextHandle) -> FHEResult<()> {
        let mut state = self.state.write();
        state.acl.require(handle, caller)?;
        if !state.ciphertexts.contains_key(handle) {
            return Err(FHEError::UnknownHandle(*handle));
        }
        state.acl.allow(*handle, *caller);
        Ok(())
    }

    fn submit_decryption(&self, caller: &Address, handle: &CiphertextHandle) -> FHEResult<()> {
        let mut state = self.state.write();
        state.acl.require(handle, caller)?;
        if !state.ciphertexts.contains_key(handle) {
            return Err(FHEError::UnknownHandle(*handle));
        }
        if state.submitted.insert(*handle) {
            state.queue.push_back(*handle);
            debug!(handle = %handle.short(), queued = state.queue.len(), "Decryption submitted");
        } else {
            debug!(handle = %handle.short(), "Decryption already submitted");
        }
        Ok(())
    }

    fn poll_decryption(&self, handle: &CiphertextHandle) -> DecryptionPoll {
        match self.state.read().results.get(handle) {
            Some(&value) => DecryptionPoll { value, ready: true },
            None => DecryptionPoll::PENDING,
        }
    }

    fn is_allowed(&self, handle: &CiphertextHandle, principal: &Address) -> bool {
        self.state.read().acl.is_allowed(handle, principal)
    }

    fn end_transaction(&self, caller: &Address) {
        let mut state = self.state.write();
        let orphaned = state.acl.clear_transient(caller);
        if orphaned.is_empty() {
            return;
        }

        let mut freed = 0;
        for handle in &orphaned {
            // A submitted handle stays until the oracle publishes its result
            if state.submitted.contains(handle) && !state.results.contains_key(handle) {
                continue;
            }
            if state.ciphertexts.remove(handle).is_some() {
                freed += 1;
            }
        }
        trace!(
            principal = %caller,
            orphaned = orphaned.len(),
            freed,
            live = state.ciphertexts.len(),
            "Transient allowances expired"
        );
    }
}
