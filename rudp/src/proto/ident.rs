use std::fmt;

use crate::proto::message_id::MessageId;

/// PacketIdent uniquely names one packet of one message; it keys the send
/// history and the positions of the receive bitmap.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PacketIdent {
    pub message_id: MessageId,
    pub packet_number: u8,
}

impl fmt::Display for PacketIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.message_id, self.packet_number)
    }
}
