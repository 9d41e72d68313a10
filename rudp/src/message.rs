use std::fmt;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::proto::flags::Flags;
use crate::proto::header::{DistilledHeader, PacketHeader};
use crate::proto::packet::Packet;
use crate::proto::{MAX_PAYLOAD_SIZE, MAX_TOTAL_PACKETS};

/// Message is one logical application unit: the per-message header fields
/// plus a payload of arbitrary length, before fragmentation on the way out
/// or after reassembly on the way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: DistilledHeader,
    pub payload: Bytes,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message[{} {} {} bytes]",
            self.header.message_type,
            self.header.message_id,
            self.payload.len()
        )
    }
}

impl Message {
    pub fn new(header: DistilledHeader, payload: Bytes) -> Self {
        Message { header, payload }
    }

    /// Splits the message into ordered, numbered packets sharing its message
    /// id. An empty payload still produces a single zero-length packet so
    /// that the message exists on the wire. Fails with `ErrMessageTooLarge`
    /// when the payload would not fit the one-octet total-packets field.
    pub fn to_packets(&self) -> Result<Vec<Packet>> {
        let total = (self.payload.len() + MAX_PAYLOAD_SIZE - 1) / MAX_PAYLOAD_SIZE;
        let total = total.max(1);
        if total > MAX_TOTAL_PACKETS {
            return Err(Error::ErrMessageTooLarge);
        }

        let mut flags = Flags::new();
        if self.header.ack_required {
            flags = flags.with_ack_required();
        }
        if total > 1 {
            flags = flags.with_fragment();
        }

        let mut packets = Vec::with_capacity(total);
        for i in 0..total {
            let start = i * MAX_PAYLOAD_SIZE;
            let end = (start + MAX_PAYLOAD_SIZE).min(self.payload.len());
            let chunk = self.payload.slice(start..end);

            let header = PacketHeader {
                version: self.header.version,
                message_id: self.header.message_id,
                message_type: self.header.message_type,
                packet_number: i as u8,
                total_packets: total as u8,
                flags,
                payload_length: chunk.len() as u16,
            };
            packets.push(Packet::new(header, chunk)?);
        }

        Ok(packets)
    }
}
