// Wire records exchanged between console and robot
//
// A payload is a sequence of fixed-width records, one per property write:
//
//   byte 0     entity id   (u8)
//   byte 1     property id (u8)
//   bytes 2-3  value       (i16, little-endian)
//
// A payload is valid iff its length is a multiple of PACKET_SIZE. Records are
// applied in order, so a later record for the same key wins.

use crate::error::{LinkError, Result};

/// Bytes per wire record
pub const PACKET_SIZE: usize = 4;

/// One (entity, property, value) write as it travels over the link.
///
/// Ids are kept raw here; validation happens when the Domain applies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub entity: u8,
    pub property: u8,
    pub value: i16,
}

impl Packet {
    pub fn new(entity: u8, property: u8, value: i16) -> Self {
        Self {
            entity,
            property,
            value,
        }
    }

    pub fn to_bytes(&self) -> [u8; PACKET_SIZE] {
        let [lo, hi] = self.value.to_le_bytes();
        [self.entity, self.property, lo, hi]
    }

    pub fn from_bytes(bytes: [u8; PACKET_SIZE]) -> Self {
        Self {
            entity: bytes[0],
            property: bytes[1],
            value: i16::from_le_bytes([bytes[2], bytes[3]]),
        }
    }
}

/// Encode packets back to back into one payload
pub fn encode_packets(packets: &[Packet]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(packets.len() * PACKET_SIZE);
    for packet in packets {
        payload.extend_from_slice(&packet.to_bytes());
    }
    payload
}

/// Decode a payload into its records, rejecting the whole payload on a
/// framing error
pub fn decode_packets(payload: &[u8]) -> Result<Vec<Packet>> {
    if payload.len() % PACKET_SIZE != 0 {
        return Err(LinkError::Framing {
            len: payload.len(),
            record: PACKET_SIZE,
        });
    }

    Ok(payload
        .chunks_exact(PACKET_SIZE)
        .map(|chunk| Packet::from_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
