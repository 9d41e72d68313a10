use std::fmt;

use crate::error::Error;

/// MessageType is the closed set of packet kinds carried on the wire.
/// Zero is invalid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Error = 1,
    Request = 2,
    Response = 3,
    Acknowledge = 4,
    RequestResend = 5,
}

impl TryFrom<u8> for MessageType {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self, Error> {
        match v {
            1 => Ok(MessageType::Error),
            2 => Ok(MessageType::Request),
            3 => Ok(MessageType::Response),
            4 => Ok(MessageType::Acknowledge),
            5 => Ok(MessageType::RequestResend),
            _ => Err(Error::ErrUnknownMessageType { typ: v }),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            MessageType::Error => "ERROR",
            MessageType::Request => "REQUEST",
            MessageType::Response => "RESPONSE",
            MessageType::Acknowledge => "ACK",
            MessageType::RequestResend => "REQUEST-RESEND",
        };
        write!(f, "{s}")
    }
}
