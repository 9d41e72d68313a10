use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::proto::header::PacketHeader;
use crate::proto::ident::PacketIdent;
use crate::proto::{generate_checksum, CHECKSUM_SIZE, HEADER_SIZE};

/// Packet is one datagram on the wire: a fixed header, the payload slice it
/// describes, and a trailing CRC-32 over header and payload.
///
///```text
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|       Header (24 octets)      |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|   Payload (PayloadLength)     |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|      CRC-32 (4 octets)        |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///```
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Bytes,
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet[{}]", self.header)
    }
}

impl Packet {
    pub fn new(header: PacketHeader, payload: Bytes) -> Result<Self> {
        header.check()?;
        if header.payload_length as usize != payload.len() {
            return Err(Error::ErrPayloadLengthField);
        }
        Ok(Packet { header, payload })
    }

    pub fn ident(&self) -> PacketIdent {
        PacketIdent {
            message_id: self.header.message_id,
            packet_number: self.header.packet_number,
        }
    }

    pub fn marshal(&self) -> Result<Bytes> {
        let mut writer =
            BytesMut::with_capacity(HEADER_SIZE + self.payload.len() + CHECKSUM_SIZE);
        self.header.marshal_to(&mut writer)?;
        writer.extend_from_slice(&self.payload);

        let checksum = generate_checksum(&writer);
        writer.put_u32(checksum);

        Ok(writer.freeze())
    }

    pub fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.len() < HEADER_SIZE + CHECKSUM_SIZE {
            return Err(Error::ErrPacketTooShort);
        }

        let header = PacketHeader::unmarshal(raw)?;

        let payload_len = header.payload_length as usize;
        if payload_len > raw.len() - HEADER_SIZE - CHECKSUM_SIZE {
            return Err(Error::ErrPayloadLengthMismatch);
        }
        let payload = raw.slice(HEADER_SIZE..HEADER_SIZE + payload_len);

        let mut trailer = &raw[raw.len() - CHECKSUM_SIZE..];
        let their_checksum = trailer.get_u32();
        let our_checksum = generate_checksum(&raw[..HEADER_SIZE + payload_len]);
        if their_checksum != our_checksum {
            return Err(Error::ErrChecksumMismatch);
        }

        Ok(Packet { header, payload })
    }
}
