use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::proto::flags::Flags;
use crate::proto::message_id::MessageId;
use crate::proto::message_type::MessageType;
use crate::proto::{HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// PacketHeader is the fixed 24-octet prefix of every packet.
///
///```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|    Version    |                                               |
///+-+-+-+-+-+-+-+-+                                               +
///|                                                               |
///+                          Message Id                           +
///|                                                               |
///+                                               +-+-+-+-+-+-+-+-+
///|                                               | Message Type  |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///| Packet Number | Total Packets |     Flags     | Payload Len.. |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///| ..Payload Len |   (reserved)  |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///```
///
/// All multi-octet fields are big-endian. The trailing reserved octet pads
/// the header to 24 bytes and must be zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    pub version: u8,
    pub message_id: MessageId,
    pub message_type: MessageType,
    pub packet_number: u8,
    pub total_packets: u8,
    pub flags: Flags,
    pub payload_length: u16,
}

impl fmt::Display for PacketHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v{} {} {} packet {}/{} len={}",
            self.version,
            self.message_type,
            self.message_id,
            self.packet_number,
            self.total_packets,
            self.payload_length,
        )
    }
}

impl PacketHeader {
    pub fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        writer.put_u8(self.version);
        writer.put_slice(self.message_id.as_bytes());
        writer.put_u8(self.message_type as u8);
        writer.put_u8(self.packet_number);
        writer.put_u8(self.total_packets);
        writer.put_u8(self.flags.0);
        writer.put_u16(self.payload_length);
        writer.put_u8(0);
        Ok(HEADER_SIZE)
    }

    pub fn marshal(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);
        self.marshal_to(&mut buf)?;
        Ok(buf.freeze())
    }

    pub fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.len() < HEADER_SIZE {
            return Err(Error::ErrHeaderTooShort);
        }

        let reader = &mut raw.clone();

        let version = reader.get_u8();
        let mut id = [0u8; 16];
        reader.copy_to_slice(&mut id);
        let message_type = MessageType::try_from(reader.get_u8())?;
        let packet_number = reader.get_u8();
        let total_packets = reader.get_u8();
        let flags = Flags(reader.get_u8());
        let payload_length = reader.get_u16();
        let reserved = reader.get_u8();
        if reserved != 0 {
            return Err(Error::ErrReservedByteNonZero);
        }

        let header = PacketHeader {
            version,
            message_id: MessageId(id),
            message_type,
            packet_number,
            total_packets,
            flags,
            payload_length,
        };
        header.check()?;

        Ok(header)
    }

    /// check enforces the field invariants shared by the decode and encode
    /// paths: a non-zero version, a non-zero message id, at least one packet,
    /// a packet number inside the message, and a payload that fits a
    /// datagram.
    pub fn check(&self) -> Result<()> {
        if self.version == 0 {
            return Err(Error::ErrVersionZero);
        }
        if self.message_id.is_zero() {
            return Err(Error::ErrMessageIdZero);
        }
        if self.total_packets == 0 {
            return Err(Error::ErrTotalPacketsZero);
        }
        if self.packet_number >= self.total_packets {
            return Err(Error::ErrPacketNumberOutOfRange);
        }
        if self.payload_length as usize > MAX_PAYLOAD_SIZE {
            return Err(Error::ErrPayloadTooLarge);
        }
        Ok(())
    }

    /// The fields identical across every packet of one message.
    pub fn distilled(&self) -> DistilledHeader {
        DistilledHeader {
            version: self.version,
            message_id: self.message_id,
            message_type: self.message_type,
            ack_required: self.flags.ack_required(),
        }
    }
}

/// DistilledHeader is the per-message subset of the packet header: what the
/// fragmenter stamps onto every packet and what the assembler captures from
/// the first packet it sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistilledHeader {
    pub version: u8,
    pub message_id: MessageId,
    pub message_type: MessageType,
    pub ack_required: bool,
}
