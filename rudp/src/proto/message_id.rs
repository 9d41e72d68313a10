use std::fmt;

/// MessageId identifies one logical application message across all of its
/// packets. Generated once per message on the sender; opaque on the wire.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub [u8; 16]);

impl MessageId {
    /// Generates a fresh random id. The all-zero id is reserved as "not set"
    /// and never produced.
    pub fn generate() -> Self {
        loop {
            let raw: [u8; 16] = rand::random();
            if raw != [0u8; 16] {
                return MessageId(raw);
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 16]
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<[u8; 16]> for MessageId {
    fn from(raw: [u8; 16]) -> Self {
        MessageId(raw)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
