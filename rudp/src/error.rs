use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("raw is too small for a packet header")]
    ErrHeaderTooShort,
    #[error("raw is too small for a full packet")]
    ErrPacketTooShort,
    #[error("payload length field exceeds remaining packet bytes")]
    ErrPayloadLengthMismatch,
    #[error("reserved header byte is non-zero")]
    ErrReservedByteNonZero,
    #[error("checksum mismatch")]
    ErrChecksumMismatch,

    #[error("packet header version not set")]
    ErrVersionZero,
    #[error("packet header message id not set")]
    ErrMessageIdZero,
    #[error("unknown message type {typ}")]
    ErrUnknownMessageType { typ: u8 },
    #[error("packet header total packets not set")]
    ErrTotalPacketsZero,
    #[error("packet number must be less than total packets")]
    ErrPacketNumberOutOfRange,
    #[error("payload exceeds the per-packet limit")]
    ErrPayloadTooLarge,
    #[error("payload length field does not match payload size")]
    ErrPayloadLengthField,

    #[error("ack payload must be exactly 17 bytes")]
    ErrAckPayloadSize,

    #[error("message exceeds the maximum fragment count")]
    ErrMessageTooLarge,

    #[error("no send-history entry for the requested packet")]
    ErrHistoryMiss,
    #[error("response payload is too short")]
    ErrResponseTooShort,

    #[error("packet drop rate must be within [0, 1)")]
    ErrDropRateOutOfRange,

    #[error("socket bind failed: {0}")]
    ErrBindFailed(String),
    #[error("socket send failed: {0}")]
    ErrSendFailed(String),

    #[error("{0}")]
    Other(String),
}

impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        io::Error::new(io::ErrorKind::Other, error.to_string())
    }
}
