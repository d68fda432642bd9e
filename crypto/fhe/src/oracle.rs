//! Decryption oracle
//!
//! Fulfils queued decryption requests of a [`FheCoprocessor`] and publishes
//! the plaintexts for polling. There is no push notification: callers observe
//! completion only through [`Coprocessor::poll_decryption`](crate::Coprocessor::poll_decryption).

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::CiphertextBackend;
use crate::coprocessor::FheCoprocessor;

/// Oracle scheduling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Delay between fulfilment rounds of the background worker
    pub fulfil_interval_ms: u64,
    /// Maximum decryptions per round
    pub batch_size: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            fulfil_interval_ms: 250,
            batch_size: 16,
        }
    }
}

impl OracleConfig {
    pub fn fulfil_interval(&self) -> Duration {
        Duration::from_millis(self.fulfil_interval_ms.max(1))
    }
}

/// Asynchronous decryption service attached to a coprocessor
pub struct DecryptionOracle<B: CiphertextBackend> {
    coprocessor: Arc<FheCoprocessor<B>>,
    config: OracleConfig,
}

impl<B: CiphertextBackend> DecryptionOracle<B> {
    pub fn new(coprocessor: Arc<FheCoprocessor<B>>, config: OracleConfig) -> Self {
        Self { coprocessor, config }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Run one fulfilment round of at most `batch_size` decryptions.
    ///
    /// Returns the number of results published. Failed decryptions are
    /// requeued for a later round.
    pub fn fulfill_pending(&self) -> usize {
        let batch = self.coprocessor.take_pending(self.config.batch_size.max(1));
        let mut published = 0;

        for (handle, ciphertext) in batch {
            match self.coprocessor.backend().decrypt(&ciphertext) {
                Ok(value) => {
                    self.coprocessor.publish(handle, value);
                    published += 1;
                }
                Err(e) => {
                    warn!(handle = %handle.short(), error = %e, "Decryption failed, requeueing");
                    self.coprocessor.requeue(handle);
                }
            }
        }

        if published > 0 {
            debug!(published, remaining = self.coprocessor.pending_decryptions(), "Oracle round complete");
        }
        published
    }

    /// Run rounds until the queue is empty or a round makes no progress
    pub fn fulfill_all(&self) -> usize {
        let mut total = 0;
        loop {
            let published = self.fulfill_pending();
            total += published;
            if published == 0 || self.coprocessor.pending_decryptions() == 0 {
                return total;
            }
        }
    }

    /// Spawn the background worker on the current tokio runtime.
    ///
    /// Decryption is CPU-bound, so each round runs on the blocking pool.
    /// Abort the returned handle to stop the worker.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let interval = self.config.fulfil_interval();
        info!(
            backend = self.coprocessor.backend().name(),
            interval_ms = interval.as_millis() as u64,
            batch = self.config.batch_size,
            "Starting decryption oracle"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if self.coprocessor.pending_decryptions() == 0 {
                    continue;
                }
                let oracle = Arc::clone(&self);
                if let Err(e) = tokio::task::spawn_blocking(move || oracle.fulfill_pending()).await {
                    warn!(error = %e, "Oracle round panicked");
                }
            }
        })
    }
}
