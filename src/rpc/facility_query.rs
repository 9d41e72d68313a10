use bytes::{BufMut, Bytes, BytesMut};

use super::utf8_string;
use crate::error::{Error, Result};

/// Payload of `FacilityQuery`: one octet of day count followed by the
/// UTF-8 facility name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityQueryPayload {
    pub name: String,
    pub days: u8,
}

impl FacilityQueryPayload {
    pub fn marshal(&self) -> Bytes {
        let mut writer = BytesMut::with_capacity(1 + self.name.len());
        writer.put_u8(self.days);
        writer.extend_from_slice(self.name.as_bytes());
        writer.freeze()
    }

    pub fn unmarshal(raw: &Bytes) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::ErrPayloadTooShort);
        }
        Ok(FacilityQueryPayload {
            days: raw[0],
            name: utf8_string(&raw[1..])?,
        })
    }
}
