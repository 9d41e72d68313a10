
pub mod ack_payload;
pub mod flags;
pub mod header;
pub mod ident;
pub mod message_id;
pub mod message_type;
pub mod packet;

use crc::{Crc, CRC_32_ISO_HDLC};

/// The only protocol version defined so far.
pub const PROTOCOL_V1: u8 = 1;

/// Hard limit for one datagram: header + payload + checksum.
pub const MAX_PACKET_SIZE: usize = 1024;

/// Number of bytes used by the fixed packet header.
pub const HEADER_SIZE: usize = 24;

/// Number of bytes used by the trailing CRC-32.
pub const CHECKSUM_SIZE: usize = 4;

/// Maximum allowable payload bytes per packet.
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - HEADER_SIZE - CHECKSUM_SIZE;

/// TotalPackets is a single octet, so one message fragments into at most 255 packets.
pub const MAX_TOTAL_PACKETS: usize = 255;

pub(crate) const IEEE_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// CRC-32 (IEEE polynomial) over header and payload bytes.
pub(crate) fn generate_checksum(data: &[u8]) -> u32 {
    let mut digest = IEEE_CRC.digest();
    digest.update(data);
    digest.finalize()
}
