use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::utf8_string;
use crate::error::{Error, Result};

/// Payload of `FacilityMonitor`: four octets of watch TTL in seconds,
/// big-endian, followed by the UTF-8 facility name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityMonitorPayload {
    pub name: String,
    pub ttl_seconds: u32,
}

impl FacilityMonitorPayload {
    pub fn marshal(&self) -> Bytes {
        let mut writer = BytesMut::with_capacity(4 + self.name.len());
        writer.put_u32(self.ttl_seconds);
        writer.extend_from_slice(self.name.as_bytes());
        writer.freeze()
    }

    pub fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.len() < 4 {
            return Err(Error::ErrPayloadTooShort);
        }
        let reader = &mut raw.clone();
        let ttl_seconds = reader.get_u32();
        Ok(FacilityMonitorPayload {
            ttl_seconds,
            name: utf8_string(&raw[4..])?,
        })
    }
}
