use bytes::Bytes;

use super::utf8_string;
use crate::error::Result;

/// Payload of `FacilityDelete`: the UTF-8 facility name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityDeletePayload {
    pub name: String,
}

impl FacilityDeletePayload {
    pub fn marshal(&self) -> Bytes {
        Bytes::copy_from_slice(self.name.as_bytes())
    }

    pub fn unmarshal(raw: &Bytes) -> Result<Self> {
        Ok(FacilityDeletePayload {
            name: utf8_string(raw)?,
        })
    }
}
