use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::proto::flags::Flags;
use crate::proto::header::PacketHeader;
use crate::proto::ident::PacketIdent;
use crate::proto::message_id::MessageId;
use crate::proto::message_type::MessageType;
use crate::proto::packet::Packet;
use crate::proto::PROTOCOL_V1;

/// Fixed payload size of Acknowledge and RequestResend packets.
pub const ACK_RESEND_PAYLOAD_SIZE: usize = 17;

/// AckResendPayload names the target packet an `Acknowledge` or a
/// `RequestResend` refers to: the full 16-octet message id followed by the
/// packet number.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AckResendPayload {
    pub message_id: MessageId,
    pub packet_number: u8,
}

impl fmt::Display for AckResendPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.message_id, self.packet_number)
    }
}

impl AckResendPayload {
    pub fn new(target: PacketIdent) -> Self {
        AckResendPayload {
            message_id: target.message_id,
            packet_number: target.packet_number,
        }
    }

    pub fn ident(&self) -> PacketIdent {
        PacketIdent {
            message_id: self.message_id,
            packet_number: self.packet_number,
        }
    }

    pub fn marshal(&self) -> Bytes {
        let mut writer = BytesMut::with_capacity(ACK_RESEND_PAYLOAD_SIZE);
        writer.put_slice(self.message_id.as_bytes());
        writer.put_u8(self.packet_number);
        writer.freeze()
    }

    pub fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.len() != ACK_RESEND_PAYLOAD_SIZE {
            return Err(Error::ErrAckPayloadSize);
        }

        let reader = &mut raw.clone();
        let mut id = [0u8; 16];
        reader.copy_to_slice(&mut id);
        let packet_number = reader.get_u8();

        Ok(AckResendPayload {
            message_id: MessageId(id),
            packet_number,
        })
    }
}

fn control_packet(message_type: MessageType, target: PacketIdent) -> Result<Packet> {
    let payload = AckResendPayload::new(target).marshal();
    let header = PacketHeader {
        version: PROTOCOL_V1,
        message_id: MessageId::generate(),
        message_type,
        packet_number: 0,
        total_packets: 1,
        flags: Flags::new(),
        payload_length: payload.len() as u16,
    };
    Packet::new(header, payload)
}

/// Builds the acknowledgement for a received packet. Acknowledgements never
/// request an acknowledgement themselves and never enter the send history.
pub fn new_acknowledge(target: PacketIdent) -> Result<Packet> {
    control_packet(MessageType::Acknowledge, target)
}

/// Builds the resend request for a packet the receiver is still missing.
pub fn new_request_resend(target: PacketIdent) -> Result<Packet> {
    control_packet(MessageType::RequestResend, target)
}
