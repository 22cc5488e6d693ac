//! Device session lifecycle
//!
//! One `DeviceSession` wraps one transport for the lifetime of a judging
//! configuration. It decodes raw notifications, forwards well-formed events
//! to the aggregator channel bound at construction time, and publishes
//! connectivity transitions on the event bus. There is no automatic
//! reconnect; that policy belongs to whoever owns the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use reftally_common::events::{EventBus, TallyEvent};
use reftally_common::model::DeviceRole;
use reftally_common::protocol::ClickEvent;

use super::transport::{DeviceTransport, Notification};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const RESET_TIMEOUT: Duration = Duration::from_secs(5);

/// One decoded event tagged with the session's role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEvent {
    pub role: DeviceRole,
    pub event: ClickEvent,
}

/// Delivery handle bound into a session, one per configuration
pub type EventSender = mpsc::Sender<SessionEvent>;

pub struct DeviceSession {
    transport: Arc<dyn DeviceTransport>,
    referee_index: u32,
    role: DeviceRole,
    bus: EventBus,
    connected: Arc<AtomicBool>,
    handler: Option<EventSender>,
    pump: Option<JoinHandle<()>>,
}

impl DeviceSession {
    pub fn new(
        transport: Arc<dyn DeviceTransport>,
        referee_index: u32,
        role: DeviceRole,
        bus: EventBus,
    ) -> Self {
        Self {
            transport,
            referee_index,
            role,
            bus,
            connected: Arc::new(AtomicBool::new(false)),
            handler: None,
            pump: None,
        }
    }

    /// Bind the delivery handle; set exactly once
    ///
    /// A rebind attempt while delivery is live (or after any bind) is
    /// ignored with a warning. Configurations exchange handlers by
    /// replacing the whole session instead.
    pub fn bind(&mut self, handler: EventSender) {
        if self.pump.is_some() {
            warn!(
                device = self.transport.id(),
                "handler rebind ignored while delivery is live"
            );
            return;
        }
        if self.handler.is_some() {
            warn!(
                device = self.transport.id(),
                "handler already bound, rebind ignored"
            );
            return;
        }
        self.handler = Some(handler);
    }

    /// Establish the link and start event delivery
    ///
    /// Returns `false` on any failure, with the cause logged; the session
    /// is left disconnected and safe to retry.
    pub async fn connect(&mut self) -> bool {
        if self.is_live() {
            warn!(device = self.transport.id(), "already connected");
            return true;
        }
        let Some(handler) = self.handler.clone() else {
            warn!(
                device = self.transport.id(),
                "connect refused: no handler bound"
            );
            return false;
        };

        let rx = match timeout(CONNECT_TIMEOUT, self.transport.connect()).await {
            Ok(Ok(rx)) => rx,
            Ok(Err(e)) => {
                warn!(device = self.transport.id(), "connect failed: {}", e);
                return false;
            }
            Err(_) => {
                warn!(device = self.transport.id(), "connect timed out");
                return false;
            }
        };

        self.connected.store(true, Ordering::Relaxed);
        self.bus.emit_lossy(TallyEvent::StatusUpdate {
            index: self.referee_index,
            role: self.role,
            connected: true,
        });
        debug!(
            device = self.transport.id(),
            index = self.referee_index,
            role = %self.role,
            "session connected"
        );

        // Stale handle from a previous link, already finished
        self.pump.take();
        self.pump = Some(tokio::spawn(pump_notifications(
            rx,
            handler,
            self.role,
            self.referee_index,
            Arc::clone(&self.connected),
            self.bus.clone(),
            self.transport.id().to_string(),
        )));
        true
    }

    /// Drop the link; idempotent, safe on a session that never connected
    pub async fn disconnect(&mut self) {
        self.transport.disconnect().await;
        if let Some(pump) = self.pump.take() {
            let _ = pump.await;
        }
        self.connected.store(false, Ordering::Relaxed);
    }

    /// Issue the reset command iff the session is live
    ///
    /// Failures are reported as `false`, never propagated; a dead device
    /// must not break a batch reset.
    pub async fn send_reset(&self) -> bool {
        if !self.is_live() {
            debug!(
                device = self.transport.id(),
                "reset skipped, session not live"
            );
            return false;
        }
        match timeout(RESET_TIMEOUT, self.transport.write_reset()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(device = self.transport.id(), "reset write failed: {}", e);
                false
            }
            Err(_) => {
                warn!(device = self.transport.id(), "reset write timed out");
                false
            }
        }
    }

    pub fn is_live(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn device_id(&self) -> &str {
        self.transport.id()
    }
}

/// Decode-and-forward loop; ends when the link drops or the aggregator
/// side of the channel is gone
async fn pump_notifications(
    mut rx: mpsc::Receiver<Notification>,
    handler: EventSender,
    role: DeviceRole,
    referee_index: u32,
    connected: Arc<AtomicBool>,
    bus: EventBus,
    device_id: String,
) {
    while let Some(payload) = rx.recv().await {
        match ClickEvent::decode(&payload) {
            Ok(event) => {
                if handler.send(SessionEvent { role, event }).await.is_err() {
                    debug!(device = %device_id, "aggregator gone, stopping delivery");
                    break;
                }
            }
            Err(e) => {
                warn!(device = %device_id, "skipping malformed notification: {}", e);
            }
        }
    }
    connected.store(false, Ordering::Relaxed);
    bus.emit_lossy(TallyEvent::StatusUpdate {
        index: referee_index,
        role,
        connected: false,
    });
    debug!(device = %device_id, "notification stream ended");
}
