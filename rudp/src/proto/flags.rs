use std::fmt;

/// The receiver must acknowledge this packet by citing its (MessageId, PacketNumber).
pub const FLAG_ACK_REQUIRED: u8 = 0x01;
/// The packet is one fragment of a multi-packet message.
pub const FLAG_FRAGMENT: u8 = 0x02;

/// Flags is the one-octet bit field of the packet header.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Flags(pub u8);

impl Flags {
    pub fn new() -> Self {
        Flags(0)
    }

    pub fn with_ack_required(mut self) -> Self {
        self.0 |= FLAG_ACK_REQUIRED;
        self
    }

    pub fn with_fragment(mut self) -> Self {
        self.0 |= FLAG_FRAGMENT;
        self
    }

    pub fn ack_required(&self) -> bool {
        self.0 & FLAG_ACK_REQUIRED != 0
    }

    pub fn fragment(&self) -> bool {
        self.0 & FLAG_FRAGMENT != 0
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ack_required={} fragment={}",
            self.ack_required(),
            self.fragment()
        )
    }
}
