use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::proto::message_id::MessageId;

/// StatusCode mirrors the HTTP numbering user-visible results are reported
/// with.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

pub const STATUS_OK: StatusCode = StatusCode(200);
pub const STATUS_BAD_REQUEST: StatusCode = StatusCode(400);
pub const STATUS_NOT_FOUND: StatusCode = StatusCode(404);
pub const STATUS_INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            STATUS_OK => "OK",
            STATUS_BAD_REQUEST => "Bad Request",
            STATUS_NOT_FOUND => "Not Found",
            STATUS_INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Unknown",
        };
        write!(f, "{} {}", self.0, s)
    }
}

/// Minimum envelope size: original message id plus status code.
pub const RESPONSE_HEADER_SIZE: usize = 18;

/// Response is the reply envelope for one request: the *request's* message
/// id (not the id of the packets the response travels in), an HTTP-style
/// status code, and the method-specific payload.
///
///```text
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///| Original Message Id (16 oct.) |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|    Status Code (2 octets)     |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|           Payload             |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub original_message_id: MessageId,
    pub status_code: StatusCode,
    pub payload: Bytes,
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Response[{} {} {} bytes]",
            self.original_message_id,
            self.status_code,
            self.payload.len()
        )
    }
}

impl Response {
    pub fn new(original_message_id: MessageId, status_code: StatusCode, payload: Bytes) -> Self {
        Response {
            original_message_id,
            status_code,
            payload,
        }
    }

    /// A bare 200 with no payload.
    pub fn ok(original_message_id: MessageId) -> Self {
        Response::new(original_message_id, STATUS_OK, Bytes::new())
    }

    /// A 200 carrying a textual payload.
    pub fn ok_with_text(original_message_id: MessageId, text: &str) -> Self {
        Response::new(
            original_message_id,
            STATUS_OK,
            Bytes::copy_from_slice(text.as_bytes()),
        )
    }

    /// A failure response carrying a textual reason.
    pub fn error(original_message_id: MessageId, status_code: StatusCode, reason: &str) -> Self {
        Response::new(
            original_message_id,
            status_code,
            Bytes::copy_from_slice(reason.as_bytes()),
        )
    }

    pub fn marshal(&self) -> Bytes {
        let mut writer = BytesMut::with_capacity(RESPONSE_HEADER_SIZE + self.payload.len());
        writer.put_slice(self.original_message_id.as_bytes());
        writer.put_u16(self.status_code.0);
        writer.extend_from_slice(&self.payload);
        writer.freeze()
    }

    pub fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.len() < RESPONSE_HEADER_SIZE {
            return Err(Error::ErrResponseTooShort);
        }

        let reader = &mut raw.clone();
        let mut id = [0u8; 16];
        reader.copy_to_slice(&mut id);
        let status_code = StatusCode(reader.get_u16());
        let payload = raw.slice(RESPONSE_HEADER_SIZE..);

        Ok(Response {
            original_message_id: MessageId(id),
            status_code,
            payload,
        })
    }
}
