//! Promiscuous-mode frame metadata
//!
//! The sniffer hands us the rx-control RSSI plus the raw 802.11 frame. Only
//! the transmitter address (addr2) is read from the MAC header so the signal
//! sample can optionally be attributed to the configured peer.

use crate::packet::MacAddress;

/// Frame control (2) + duration (2) + addr1 (6)
const ADDR2_OFFSET: usize = 10;

/// One observation from the frame monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSample {
    /// Received power in dBm as reported by the radio
    pub rssi: i8,
    /// 802.11 transmitter address, when the header carries one
    pub transmitter: Option<MacAddress>,
}

impl FrameSample {
    /// Build a sample from the driver's rx-control RSSI and the raw frame
    pub fn from_raw(rssi: i32, frame: &[u8]) -> Self {
        Self {
            rssi: clamp_rssi(rssi),
            transmitter: transmitter_address(frame),
        }
    }
}

/// Narrow the driver's RSSI to the packet's signed byte
pub fn clamp_rssi(rssi: i32) -> i8 {
    rssi.clamp(i8::MIN as i32, i8::MAX as i32) as i8
}

/// Transmitter address (addr2) of an 802.11 frame.
///
/// Control frames such as CTS and ACK end after addr1, so they yield `None`.
pub fn transmitter_address(frame: &[u8]) -> Option<MacAddress> {
    let addr2: [u8; 6] = frame.get(ADDR2_OFFSET..ADDR2_OFFSET + 6)?.try_into().ok()?;
    Some(MacAddress::new(addr2))
}
