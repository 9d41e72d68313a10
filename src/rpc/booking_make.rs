use std::time::{Duration, SystemTime};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::utf8_string;
use crate::booking::Booking;
use crate::error::{Error, Result};

/// Payload of `BookingMake`: four octets of start hour and three octets of
/// end hour (both big-endian hours since the Unix epoch), followed by the
/// UTF-8 facility name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingMakePayload {
    pub name: String,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl BookingMakePayload {
    pub fn marshal(&self) -> Bytes {
        let mut writer = BytesMut::with_capacity(7 + self.name.len());
        writer.put_u32(self.start_hour);
        let end = self.end_hour.to_be_bytes();
        writer.put_slice(&end[1..]);
        writer.extend_from_slice(self.name.as_bytes());
        writer.freeze()
    }

    pub fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.len() < 7 {
            return Err(Error::ErrPayloadTooShort);
        }
        let reader = &mut raw.clone();
        let start_hour = reader.get_u32();
        let end_hour = u32::from_be_bytes([0, raw[4], raw[5], raw[6]]);
        Ok(BookingMakePayload {
            start_hour,
            end_hour,
            name: utf8_string(&raw[7..])?,
        })
    }

    /// The requested slot as a booking with a fresh random id.
    pub fn booking(&self) -> Result<Booking> {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(self.start_hour as u64 * 3600);
        let end = SystemTime::UNIX_EPOCH + Duration::from_secs(self.end_hour as u64 * 3600);
        Booking::with_random_id(start, end)
    }
}
