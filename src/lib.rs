#![cfg_attr(not(test), no_std)]

//! ESP32-C3 ESP-NOW Peer Signal Board Library
//!
//! This library provides modules for a two-device ESP-NOW demo: each board
//! broadcasts its name to a fixed peer, sniffs frame signal strength in
//! promiscuous mode and shows the peer's name with the measured RSSI on an
//! SSD1306 OLED.
//!
//! Everything except [`radio`] is hardware-free and unit tested on the host.

use core::fmt;

pub mod broadcast;
pub mod display;
pub mod frame;
pub mod link;
pub mod packet;
#[cfg(target_arch = "riscv32")]
pub mod radio;
pub mod schedule;
pub mod setup;

/// Project version information
pub const VERSION: &str = "0.1.0-dev";

/// Default configuration constants
pub mod config {
    use crate::link::SignalFilter;
    use embassy_time::Duration;

    /// Interval between two ESP-NOW broadcasts
    pub const BROADCAST_INTERVAL: Duration = Duration::from_millis(2000);

    /// Peer MAC address, `AA:BB:CC:DD:EE:FF`
    /// Read from environment variables at compile time
    pub const PEER_ADDRESS: &str = env!("PEER_ADDRESS");

    /// Name broadcast to the peer
    pub const DEVICE_NAME: &str = env!("DEVICE_NAME");

    /// Which sniffed frames may update the displayed signal strength
    pub const SIGNAL_FILTER: SignalFilter = match env!("SIGNAL_FILTER").as_bytes() {
        b"peer" => SignalFilter::PeerOnly,
        _ => SignalFilter::AnyFrame,
    };

    /// ESP-NOW channel, `None` keeps the radio's current channel
    pub const ESPNOW_CHANNEL: Option<u8> = None;

    /// SSD1306 I2C address
    pub const DISPLAY_I2C_ADDRESS: u8 = 0x3C;

    /// I2C bus frequency in kHz
    pub const I2C_FREQUENCY_KHZ: u32 = 400;

    /// I2C data GPIO pin
    pub const I2C_SDA_PIN: u8 = 5;

    /// I2C clock GPIO pin
    pub const I2C_SCL_PIN: u8 = 6;

    /// Display geometry in pixels
    pub const DISPLAY_WIDTH: u32 = 128;
    pub const DISPLAY_HEIGHT: u32 = 64;

    /// Text origin (top left of the first line)
    pub const TEXT_ORIGIN: (i32, i32) = (0, 10);

    /// Delay between clearing the panel at boot and the first flush
    pub const DISPLAY_SETTLE_MS: u64 = 100;

    /// Depth of the link event queue between radio tasks and the dispatcher
    pub const EVENT_QUEUE_DEPTH: usize = 8;

    /// Log link statistics every this many send completions
    pub const STATS_LOG_EVERY: u32 = 30;

    /// Parse [`PEER_ADDRESS`]
    pub fn peer_address() -> Result<crate::packet::MacAddress, crate::BoardError> {
        crate::packet::MacAddress::parse(PEER_ADDRESS)
    }
}

/// Error types for the peer signal board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    /// WiFi driver or ESP-NOW error
    RadioError,
    /// Display bus or panel error
    DisplayError,
    /// Wire format parsing error
    ProtocolError,
    /// Malformed build-time configuration
    ConfigError,
    /// System error
    SystemError,
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BoardError::RadioError => "radio error",
            BoardError::DisplayError => "display error",
            BoardError::ProtocolError => "protocol error",
            BoardError::ConfigError => "configuration error",
            BoardError::SystemError => "system error",
        };
        f.write_str(text)
    }
}
