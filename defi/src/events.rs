//! Hook events
//!
//! Non-confidential notifications for off-chain consumers. No event carries
//! an amount, a total or ciphertext content.

use std::sync::Arc;

use cloak_fhe::Address;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::pool::PoolId;

/// Events emitted by the hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HookEvent {
    /// A liquidity delta was folded into the pool's encrypted totals
    LiquidityTracked { pool_id: PoolId, is_addition: bool },
    /// The owner asked the oracle to decrypt the pool's totals
    DecryptionRequested { pool_id: PoolId, requester: Address },
    /// The owner reset the pool's totals and cleared any disclosure
    TrackingReset { pool_id: PoolId, caller: Address },
}

impl HookEvent {
    pub fn pool_id(&self) -> &PoolId {
        match self {
            HookEvent::LiquidityTracked { pool_id, .. }
            | HookEvent::DecryptionRequested { pool_id, .. }
            | HookEvent::TrackingReset { pool_id, .. } => pool_id,
        }
    }
}

/// Destination for hook events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: HookEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: HookEvent) {
        (**self).emit(event)
    }
}

/// Broadcast to any number of subscribers; events are dropped when nobody listens
impl EventSink for broadcast::Sender<HookEvent> {
    fn emit(&self, event: HookEvent) {
        let _ = self.send(event);
    }
}

/// In-memory event log. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<HookEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every recorded event, oldest first
    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().clone()
    }

    /// Remove and return every recorded event
    pub fn drain(&self) -> Vec<HookEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: HookEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(byte: u8) -> HookEvent {
        HookEvent::LiquidityTracked {
            pool_id: PoolId::from([byte; 32]),
            is_addition: true,
        }
    }

    #[test]
    fn test_event_log_shared_between_clones() {
        let log = EventLog::new();
        let handle = log.clone();
        handle.emit(tracked(1));
        handle.emit(tracked(2));

        assert_eq!(log.len(), 2);
        assert_eq!(log.drain().len(), 2);
        assert!(handle.is_empty());
    }

    #[test]
    fn test_broadcast_sink_without_receivers() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        tx.emit(tracked(1));
    }

    #[test]
    fn test_broadcast_sink_delivers() {
        let (tx, mut rx) = broadcast::channel(4);
        tx.emit(tracked(3));
        assert_eq!(rx.try_recv().unwrap(), tracked(3));
    }

    #[test]
    fn test_event_json_shape() {
        let event = HookEvent::DecryptionRequested {
            pool_id: PoolId::from([0xab; 32]),
            requester: Address::repeat_byte(1),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "decryption_requested");
        assert_eq!(json["requester"], Address::repeat_byte(1).to_string());
        assert_eq!(event.pool_id(), &PoolId::from([0xab; 32]));
    }
}
