//! Simulated device hub
//!
//! Stands in for the radio link during tests and demo runs: devices are
//! registered by name, and a per-device handle injects notification
//! payloads, severs the link, and counts reset writes. Connection latency
//! is zero and connecting to an unregistered device fails, which is enough
//! surface to exercise every session code path.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use reftally_common::protocol::ClickEvent;

use super::transport::{DeviceInfo, DeviceProvider, DeviceTransport, Notification, TransportError};

const NOTIFY_QUEUE: usize = 64;

struct SimDeviceShared {
    id: String,
    connected: AtomicBool,
    reset_count: AtomicUsize,
    sender: Mutex<Option<mpsc::Sender<Notification>>>,
}

/// Registry of simulated devices, usable as a [`DeviceProvider`]
#[derive(Default)]
pub struct SimHub {
    devices: Mutex<HashMap<String, Arc<SimDeviceShared>>>,
}

impl SimHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device under `id`, returning its control handle
    ///
    /// Re-registering an id replaces the previous device.
    pub fn register(&self, id: &str) -> SimDeviceHandle {
        let shared = Arc::new(SimDeviceShared {
            id: id.to_string(),
            connected: AtomicBool::new(false),
            reset_count: AtomicUsize::new(0),
            sender: Mutex::new(None),
        });
        self.devices
            .lock()
            .unwrap()
            .insert(id.to_string(), Arc::clone(&shared));
        SimDeviceHandle { shared }
    }
}

impl DeviceProvider for SimHub {
    fn list(&self) -> Vec<DeviceInfo> {
        let mut infos: Vec<DeviceInfo> = self
            .devices
            .lock()
            .unwrap()
            .keys()
            .map(|id| DeviceInfo {
                id: id.clone(),
                name: id.clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    fn open(&self, id: &str) -> Option<Arc<dyn DeviceTransport>> {
        let shared = Arc::clone(self.devices.lock().unwrap().get(id)?);
        Some(Arc::new(SimTransport { shared }))
    }
}

/// Test-side control of one simulated device
pub struct SimDeviceHandle {
    shared: Arc<SimDeviceShared>,
}

impl SimDeviceHandle {
    /// Push a raw notification payload; `false` if nothing is connected
    /// or the queue is full
    pub fn inject(&self, payload: Notification) -> bool {
        let sender = self.shared.sender.lock().unwrap();
        match sender.as_ref() {
            Some(tx) => tx.try_send(payload).is_ok(),
            None => false,
        }
    }

    /// Push one encoded click event
    pub fn inject_event(&self, event: &ClickEvent) -> bool {
        self.inject(event.encode().to_vec())
    }

    /// Sever the link; the session sees its notification stream end
    pub fn sever_link(&self) {
        self.shared.sender.lock().unwrap().take();
        self.shared.connected.store(false, Ordering::Relaxed);
    }

    /// Number of reset commands the device has accepted
    pub fn reset_count(&self) -> usize {
        self.shared.reset_count.load(Ordering::Relaxed)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Relaxed)
    }
}

struct SimTransport {
    shared: Arc<SimDeviceShared>,
}

#[async_trait]
impl DeviceTransport for SimTransport {
    fn id(&self) -> &str {
        &self.shared.id
    }

    async fn connect(&self) -> Result<mpsc::Receiver<Notification>, TransportError> {
        let (tx, rx) = mpsc::channel(NOTIFY_QUEUE);
        *self.shared.sender.lock().unwrap() = Some(tx);
        self.shared.connected.store(true, Ordering::Relaxed);
        Ok(rx)
    }

    async fn disconnect(&self) {
        self.shared.sender.lock().unwrap().take();
        self.shared.connected.store(false, Ordering::Relaxed);
    }

    async fn write_reset(&self) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.shared.reset_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Relaxed)
    }
}
