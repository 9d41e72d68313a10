
pub mod booking_delete;
pub mod booking_make;
pub mod booking_update;
pub mod facility_create;
pub mod facility_delete;
pub mod facility_monitor;
pub mod facility_query;
pub mod method;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use method::Method;

/// Request is the envelope every request message carries: one method
/// identifier octet followed by the method-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub payload: Bytes,
}

impl Request {
    pub fn new(method: Method, payload: Bytes) -> Self {
        Request { method, payload }
    }

    pub fn marshal(&self) -> Bytes {
        let mut writer = BytesMut::with_capacity(1 + self.payload.len());
        writer.put_u8(self.method.0);
        writer.extend_from_slice(&self.payload);
        writer.freeze()
    }

    pub fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::ErrPayloadTooShort);
        }
        Ok(Request {
            method: Method(raw[0]),
            payload: raw.slice(1..),
        })
    }
}

pub(crate) fn utf8_string(raw: &[u8]) -> Result<String> {
    String::from_utf8(raw.to_vec()).map_err(|_| Error::ErrPayloadNotUtf8)
}
