//! Device transport boundary
//!
//! The link to physical click-counters sits behind [`DeviceTransport`] so
//! the scoring core never touches a radio stack directly. A transport
//! delivers raw notification payloads over a channel that closes when the
//! link drops, and accepts the single-byte reset command. Discovery and
//! opening belong to [`DeviceProvider`].

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Raw notification payload as received from a device
pub type Notification = Vec<u8>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("device unreachable: {0}")]
    Unreachable(String),

    #[error("device not connected")]
    NotConnected,

    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// One discoverable device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
}

/// Link to one physical counter
///
/// Implementations must be safe to share behind `Arc`: `write_reset` may be
/// called while the notification pump holds the receiver.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Stable device identity (address or advertised name)
    fn id(&self) -> &str;

    /// Establish the link and start notification delivery
    ///
    /// The returned channel closes when the link drops, however that
    /// happens; there is no automatic reconnect at this layer.
    async fn connect(&self) -> Result<mpsc::Receiver<Notification>, TransportError>;

    /// Drop the link; safe to call when not connected
    async fn disconnect(&self);

    /// Write the reset command byte to the device
    async fn write_reset(&self) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;
}

/// Discovery and opening of transports
pub trait DeviceProvider: Send + Sync {
    /// Cached discovery snapshot
    fn list(&self) -> Vec<DeviceInfo>;

    /// Open a transport for a known device id; `None` if unknown
    fn open(&self, id: &str) -> Option<Arc<dyn DeviceTransport>>;
}
