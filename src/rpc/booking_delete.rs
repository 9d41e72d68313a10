use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Payload of `BookingDelete`: the booking id, two octets big-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDeletePayload {
    pub id: u16,
}

impl BookingDeletePayload {
    pub fn marshal(&self) -> Bytes {
        let mut writer = BytesMut::with_capacity(2);
        writer.put_u16(self.id);
        writer.freeze()
    }

    pub fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.len() < 2 {
            return Err(Error::ErrPayloadTooShort);
        }
        let reader = &mut raw.clone();
        Ok(BookingDeletePayload {
            id: reader.get_u16(),
        })
    }
}
