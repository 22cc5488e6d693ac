//! Event types and the broadcast bus
//!
//! Score and device-status notifications fan out to listeners (SSE clients,
//! tests) over a bounded `tokio::broadcast` channel. Delivery is best-effort:
//! a lagging listener drops messages, it never stalls the scoring path.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::DeviceRole;

/// Notification payloads published by the live service
///
/// Serializes as `{"type": ..., "payload": {...}}`, the shape listeners
/// receive over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TallyEvent {
    /// Authoritative score recomputed for one referee slot
    ///
    /// Emitted exactly once per processed click event and once after a
    /// reset (reflecting zeros).
    ScoreUpdate {
        index: u32,
        total: i32,
        plus: i32,
        minus: i32,
    },

    /// Device session connectivity change
    StatusUpdate {
        index: u32,
        role: DeviceRole,
        connected: bool,
    },
}

impl TallyEvent {
    /// Event type name, used as the SSE event field
    pub fn event_type(&self) -> &'static str {
        match self {
            TallyEvent::ScoreUpdate { .. } => "score_update",
            TallyEvent::StatusUpdate { .. } => "status_update",
        }
    }
}

/// Central event distribution bus
///
/// Wraps `tokio::broadcast`, providing non-blocking publish (slow
/// subscribers never block producers), multiple concurrent subscribers,
/// and automatic cleanup when subscribers drop.
///
/// # Examples
///
/// ```
/// use reftally_common::events::{EventBus, TallyEvent};
///
/// let bus = EventBus::new(256);
/// let mut rx = bus.subscribe();
/// bus.emit_lossy(TallyEvent::ScoreUpdate { index: 0, total: 1, plus: 1, minus: 0 });
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TallyEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TallyEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`; `Err` means no subscriber is
    /// currently listening.
    pub fn emit(
        &self,
        event: TallyEvent,
    ) -> Result<usize, broadcast::error::SendError<TallyEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    ///
    /// Score updates are fire-and-forget; it is normal for no UI to be
    /// attached while a bout is being scored.
    pub fn emit_lossy(&self, event: TallyEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_update_wire_shape() {
        let event = TallyEvent::ScoreUpdate {
            index: 2,
            total: 3,
            plus: 5,
            minus: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "score_update");
        assert_eq!(json["payload"]["index"], 2);
        assert_eq!(json["payload"]["total"], 3);
        assert_eq!(json["payload"]["plus"], 5);
        assert_eq!(json["payload"]["minus"], 2);
        assert_eq!(event.event_type(), "score_update");
    }

    #[test]
    fn status_update_wire_shape() {
        let event = TallyEvent::StatusUpdate {
            index: 0,
            role: DeviceRole::Secondary,
            connected: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status_update");
        assert_eq!(json["payload"]["role"], "SECONDARY");
        assert_eq!(json["payload"]["connected"], false);
    }

    #[tokio::test]
    async fn bus_delivers_to_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let sent = TallyEvent::ScoreUpdate {
            index: 1,
            total: -1,
            plus: 0,
            minus: 1,
        };
        bus.emit(sent.clone()).unwrap();
        assert_eq!(rx.recv().await.unwrap(), sent);
    }

    #[test]
    fn lossy_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit_lossy(TallyEvent::ScoreUpdate {
            index: 0,
            total: 0,
            plus: 0,
            minus: 0,
        });
    }
}
