use crate::protocol::error::{ProtocolError, Result};
use std::net::Ipv4Addr;

/// Size of a Channel Access message header in bytes
pub const HEADER_SIZE: usize = 16;

/// Largest UDP payload expected on an Ethernet-class LAN (MTU minus IP and
/// UDP headers); the OS truncates anything larger without telling us.
pub const ETHERNET_MAX_UDP: usize = 1500 - 20 - 8;

/// Version/echo command, harmless to every client; used to poke sockets
pub const CA_PROTO_NOOP: u16 = 0;

/// Reply sent to a client whose registration was accepted
pub const REPEATER_CONFIRM: u16 = 17;

/// Registration request from a local client
pub const REPEATER_REGISTER: u16 = 24;

/// The fixed-size Channel Access message header.
///
/// The repeater treats everything after `command` as opaque: datagrams are
/// forwarded byte-for-byte, and only the two repeater commands plus the
/// NOOP poke are ever constructed locally. `available` (parameter 2)
/// carries the registrant's own IPv4 address in a CONFIRM reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaHeader {
    pub command: u16,
    pub payload_size: u16,
    pub data_type: u16,
    pub data_count: u16,
    pub cid: u32,
    pub available: u32,
}

impl CaHeader {
    /// A confirmation header echoing the registrant's own address.
    pub fn confirm(client_addr: Ipv4Addr) -> Self {
        Self {
            command: REPEATER_CONFIRM,
            available: u32::from(client_addr),
            ..Self::default()
        }
    }

    /// A no-op poke: command set, everything else zero.
    pub fn noop() -> Self {
        Self {
            command: CA_PROTO_NOOP,
            ..Self::default()
        }
    }

    /// Serialize to the on-wire representation (all fields big-endian).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.command.to_be_bytes());
        buf[2..4].copy_from_slice(&self.payload_size.to_be_bytes());
        buf[4..6].copy_from_slice(&self.data_type.to_be_bytes());
        buf[6..8].copy_from_slice(&self.data_count.to_be_bytes());
        buf[8..12].copy_from_slice(&self.cid.to_be_bytes());
        buf[12..16].copy_from_slice(&self.available.to_be_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ProtocolError::TooShort {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            command: u16::from_be_bytes([bytes[0], bytes[1]]),
            payload_size: u16::from_be_bytes([bytes[2], bytes[3]]),
            data_type: u16::from_be_bytes([bytes[4], bytes[5]]),
            data_count: u16::from_be_bytes([bytes[6], bytes[7]]),
            cid: u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            available: u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        })
    }

    /// Peek at the command field without decoding the whole header.
    /// Returns `None` for datagrams shorter than a header.
    pub fn peek_command(bytes: &[u8]) -> Option<u16> {
        if bytes.len() < HEADER_SIZE {
            return None;
        }
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}
