use bytes::Bytes;

use super::utf8_string;
use crate::error::Result;

/// Payload of `FacilityCreate`: the UTF-8 facility name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityCreatePayload {
    pub name: String,
}

impl FacilityCreatePayload {
    pub fn marshal(&self) -> Bytes {
        Bytes::copy_from_slice(self.name.as_bytes())
    }

    pub fn unmarshal(raw: &Bytes) -> Result<Self> {
        Ok(FacilityCreatePayload {
            name: utf8_string(raw)?,
        })
    }
}
