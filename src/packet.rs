//! ESP-NOW identity packet
//!
//! Wire layout (33 bytes):
//!
//! | offset | size | field                                             |
//! |--------|------|---------------------------------------------------|
//! | 0      | 32   | sender name, NUL padded, unterminated when full   |
//! | 32     | 1    | signal strength (i8), reserved on receipt         |

use crate::BoardError;
use core::fmt;
use heapless::String;

/// Size of the name field on the wire
pub const NAME_FIELD_LEN: usize = 32;

/// Longest name we send; leaves room for a terminating NUL
pub const MAX_NAME_LEN: usize = NAME_FIELD_LEN - 1;

/// Total encoded packet size
pub const PACKET_LEN: usize = NAME_FIELD_LEN + 1;

/// 6-byte hardware address of a radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Parse `AA:BB:CC:DD:EE:FF` (case-insensitive)
    pub fn parse(text: &str) -> Result<Self, BoardError> {
        let mut octets = [0u8; 6];
        let mut parts = text.split(':');

        for octet in octets.iter_mut() {
            let part = parts.next().ok_or(BoardError::ConfigError)?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(BoardError::ConfigError);
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| BoardError::ConfigError)?;
        }

        if parts.next().is_some() {
            return Err(BoardError::ConfigError);
        }

        Ok(Self(octets))
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

/// Bounded, NUL-free UTF-8 name carried in the packet's name field
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PeerName(String<NAME_FIELD_LEN>);

impl PeerName {
    /// Build a name for sending; at most [`MAX_NAME_LEN`] bytes, no NUL
    pub fn new(name: &str) -> Result<Self, BoardError> {
        if name.len() > MAX_NAME_LEN || name.contains('\0') {
            return Err(BoardError::ConfigError);
        }
        let mut text = String::new();
        text.push_str(name).map_err(|_| BoardError::ConfigError)?;
        Ok(Self(text))
    }

    /// Decode the name field: up to the first NUL, or all 32 bytes when unterminated
    pub fn from_field(field: &[u8; NAME_FIELD_LEN]) -> Result<Self, BoardError> {
        let end = field.iter().position(|&b| b == 0).unwrap_or(NAME_FIELD_LEN);
        let name = core::str::from_utf8(&field[..end]).map_err(|_| BoardError::ProtocolError)?;
        let mut text = String::new();
        text.push_str(name).map_err(|_| BoardError::ProtocolError)?;
        Ok(Self(text))
    }

    /// Encode into a NUL padded field
    pub fn to_field(&self) -> [u8; NAME_FIELD_LEN] {
        let mut field = [0u8; NAME_FIELD_LEN];
        let bytes = self.0.as_bytes();
        field[..bytes.len()].copy_from_slice(bytes);
        field
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PeerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity packet exchanged between the two boards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Sender name
    pub name: PeerName,
    /// Signal strength slot; the receiver ignores it and measures its own
    pub signal_strength: i8,
}

impl Packet {
    /// Outgoing packet for this device; the signal strength slot is unused
    pub fn outgoing(name: PeerName) -> Self {
        Self {
            name,
            signal_strength: 0,
        }
    }

    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut buffer = [0u8; PACKET_LEN];
        buffer[..NAME_FIELD_LEN].copy_from_slice(&self.name.to_field());
        buffer[NAME_FIELD_LEN] = self.signal_strength as u8;
        buffer
    }

    /// Decode the peer-reported part of a received packet.
    ///
    /// Only the name field is required. The trailing signal byte is reserved
    /// on receipt and the value is measured locally instead, so a 32-byte
    /// payload is accepted and anything past byte 33 is ignored.
    pub fn decode_name(data: &[u8]) -> Result<PeerName, BoardError> {
        let field: &[u8; NAME_FIELD_LEN] = data
            .get(..NAME_FIELD_LEN)
            .and_then(|head| head.try_into().ok())
            .ok_or(BoardError::ProtocolError)?;
        PeerName::from_field(field)
    }
}
