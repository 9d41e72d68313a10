
pub mod facility;
pub mod manager;
pub mod monitor;

pub use facility::Facility;
pub use manager::Manager;
pub use monitor::Monitor;

use std::fmt;
use std::time::{Duration, SystemTime};

use crate::error::{Error, Result};

/// One reservation of a facility: a non-zero id and a half-open time range.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Booking {
    pub id: u16,
    pub start: SystemTime,
    pub end: SystemTime,
}

impl fmt::Display for Booking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Booking {:#06x}", self.id)
    }
}

impl Booking {
    pub fn new(id: u16, start: SystemTime, end: SystemTime) -> Result<Self> {
        let booking = Booking { id, start, end };
        booking.validate()?;
        Ok(booking)
    }

    /// Builds a booking with a freshly rolled non-zero id.
    pub fn with_random_id(start: SystemTime, end: SystemTime) -> Result<Self> {
        let id = loop {
            let id: u16 = rand::random();
            if id != 0 {
                break id;
            }
        };
        Booking::new(id, start, end)
    }

    fn validate(&self) -> Result<()> {
        if self.id == 0 || self.start >= self.end {
            return Err(Error::ErrInvalidBooking);
        }
        Ok(())
    }

    pub fn overlaps(&self, other: &Booking) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The same booking moved by a signed number of hours. None when the
    /// shift would fall outside representable time.
    pub fn shift(&self, delta_hours: i64) -> Option<Booking> {
        let delta = Duration::from_secs(delta_hours.unsigned_abs() * 3600);
        let (start, end) = if delta_hours >= 0 {
            (self.start.checked_add(delta)?, self.end.checked_add(delta)?)
        } else {
            (self.start.checked_sub(delta)?, self.end.checked_sub(delta)?)
        };
        Some(Booking {
            id: self.id,
            start,
            end,
        })
    }
}
