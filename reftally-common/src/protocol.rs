//! Click-counter wire protocol
//!
//! Counters notify their cumulative state as a fixed 17-byte little-endian
//! packet and accept a single-byte reset command. The packet carries running
//! totals, not deltas, so a re-sent packet after a reconnect is safe to apply
//! twice.
//!
//! Packet layout:
//!
//! | offset | size | field               | type |
//! |--------|------|---------------------|------|
//! | 0      | 4    | current_total       | i32  |
//! | 4      | 1    | event_type          | i8   |
//! | 5      | 4    | total_plus          | i32  |
//! | 9      | 4    | total_minus         | i32  |
//! | 13     | 4    | device_timestamp_ms | u32  |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exact length of a click notification packet
pub const EVENT_PACKET_LEN: usize = 17;

/// Command byte written to a counter to zero its totals
pub const RESET_COMMAND: [u8; 1] = [0x01];

/// Advertised name prefix of supported counters
pub const DEVICE_NAME_PREFIX: &str = "Counter-";

/// Errors produced while decoding counter notifications
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("packet length {0}, expected {EVENT_PACKET_LEN}")]
    BadLength(usize),
}

/// One decoded counter notification
///
/// Immutable once decoded. `total_plus`/`total_minus` are cumulative since
/// the counter's last reset; `device_timestamp_ms` is the counter's own
/// millisecond clock and wraps independently of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub current_total: i32,
    pub event_type: i8,
    pub total_plus: i32,
    pub total_minus: i32,
    pub device_timestamp_ms: u32,
}

impl ClickEvent {
    /// Decode a raw notification payload
    ///
    /// Any payload that is not exactly [`EVENT_PACKET_LEN`] bytes is
    /// rejected; callers skip the payload and keep the session alive.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() != EVENT_PACKET_LEN {
            return Err(ProtocolError::BadLength(payload.len()));
        }
        Ok(Self {
            current_total: le_i32(&payload[0..4]),
            event_type: payload[4] as i8,
            total_plus: le_i32(&payload[5..9]),
            total_minus: le_i32(&payload[9..13]),
            device_timestamp_ms: u32::from_le_bytes([
                payload[13],
                payload[14],
                payload[15],
                payload[16],
            ]),
        })
    }

    /// Encode to the wire layout
    ///
    /// Used by the simulated transport; real counters are the only other
    /// producer of this layout.
    pub fn encode(&self) -> [u8; EVENT_PACKET_LEN] {
        let mut buf = [0u8; EVENT_PACKET_LEN];
        buf[0..4].copy_from_slice(&self.current_total.to_le_bytes());
        buf[4] = self.event_type as u8;
        buf[5..9].copy_from_slice(&self.total_plus.to_le_bytes());
        buf[9..13].copy_from_slice(&self.total_minus.to_le_bytes());
        buf[13..17].copy_from_slice(&self.device_timestamp_ms.to_le_bytes());
        buf
    }
}

fn le_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_known_packet() {
        // total=5, event_type=1, plus=7, minus=2, ts=1000ms
        let mut payload = Vec::new();
        payload.extend_from_slice(&5i32.to_le_bytes());
        payload.push(1u8);
        payload.extend_from_slice(&7i32.to_le_bytes());
        payload.extend_from_slice(&2i32.to_le_bytes());
        payload.extend_from_slice(&1000u32.to_le_bytes());

        let event = ClickEvent::decode(&payload).unwrap();
        assert_eq!(event.current_total, 5);
        assert_eq!(event.event_type, 1);
        assert_eq!(event.total_plus, 7);
        assert_eq!(event.total_minus, 2);
        assert_eq!(event.device_timestamp_ms, 1000);
    }

    #[test]
    fn decode_negative_fields() {
        let event = ClickEvent {
            current_total: -3,
            event_type: -1,
            total_plus: 1,
            total_minus: 4,
            device_timestamp_ms: u32::MAX,
        };
        let decoded = ClickEvent::decode(&event.encode()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert_eq!(
            ClickEvent::decode(&[0u8; 16]),
            Err(ProtocolError::BadLength(16))
        );
        assert_eq!(
            ClickEvent::decode(&[0u8; 18]),
            Err(ProtocolError::BadLength(18))
        );
        assert_eq!(ClickEvent::decode(&[]), Err(ProtocolError::BadLength(0)));
    }
}
