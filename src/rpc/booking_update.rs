use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

const PAYLOAD_SIZE: usize = 6;

/// Payload of `BookingUpdate`, fixed six octets: two of booking id, one
/// sign flag (0x01 set means the shift is backwards in time), and three of
/// absolute delta hours, all big-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingUpdatePayload {
    pub id: u16,
    pub delta_hours: i64,
}

impl BookingUpdatePayload {
    pub fn new(id: u16, delta_hours: i64) -> Self {
        BookingUpdatePayload { id, delta_hours }
    }

    pub fn marshal(&self) -> Bytes {
        let mut writer = BytesMut::with_capacity(PAYLOAD_SIZE);
        writer.put_u16(self.id);
        writer.put_u8(if self.delta_hours < 0 { 0x01 } else { 0x00 });
        let magnitude = (self.delta_hours.unsigned_abs() as u32).to_be_bytes();
        writer.put_slice(&magnitude[1..]);
        writer.freeze()
    }

    pub fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.len() != PAYLOAD_SIZE {
            return Err(Error::ErrPayloadSize);
        }
        let reader = &mut raw.clone();
        let id = reader.get_u16();
        let flags = reader.get_u8();
        let magnitude = u32::from_be_bytes([0, raw[3], raw[4], raw[5]]) as i64;
        let delta_hours = if flags & 0x01 != 0 {
            -magnitude
        } else {
            magnitude
        };
        Ok(BookingUpdatePayload { id, delta_hours })
    }
}
