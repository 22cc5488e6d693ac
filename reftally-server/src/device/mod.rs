//! Device transport, session lifecycle, and the simulated hub

pub mod session;
pub mod sim;
pub mod transport;

pub use session::{DeviceSession, EventSender, SessionEvent};
pub use sim::{SimDeviceHandle, SimHub};
pub use transport::{DeviceInfo, DeviceProvider, DeviceTransport, TransportError};
