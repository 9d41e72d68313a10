#[cfg(test)]
mod facility_test;

use std::time::SystemTime;

use chrono::{DateTime, Local};

use super::Booking;
use crate::error::{Error, Result};

/// A named facility holding its bookings sorted by start time, with no two
/// bookings overlapping.
#[derive(Debug, Default)]
pub struct Facility {
    name: String,
    bookings: Vec<Booking>,
}

impl Facility {
    pub fn new(name: &str) -> Self {
        Facility {
            name: name.to_string(),
            bookings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    pub fn has_booking(&self, id: u16) -> bool {
        self.bookings.iter().any(|b| b.id == id)
    }

    /// Drops bookings that have already finished.
    pub(crate) fn clean(&mut self) {
        let now = SystemTime::now();
        self.bookings.retain(|b| b.end > now);
    }

    /// Inserts in sorted order if it fits without overlapping a neighbor.
    fn insert(&mut self, booking: Booking) -> bool {
        let index = match self
            .bookings
            .binary_search_by(|b| b.start.cmp(&booking.start))
        {
            // same start time always clashes
            Ok(_) => return false,
            Err(index) => index,
        };

        if index > 0 && self.bookings[index - 1].overlaps(&booking) {
            return false;
        }
        if index < self.bookings.len() && self.bookings[index].overlaps(&booking) {
            return false;
        }

        self.bookings.insert(index, booking);
        true
    }

    pub fn book(&mut self, booking: Booking) -> Result<()> {
        self.clean();
        if !self.insert(booking) {
            log::error!("unable to insert {booking} into {}: clash", self.name);
            return Err(Error::ErrBookingConflict);
        }
        Ok(())
    }

    /// Moves a booking by a signed number of hours, falling back to the
    /// original slot when the new one clashes.
    pub fn update_booking(&mut self, id: u16, delta_hours: i64) -> Result<()> {
        self.clean();

        let index = self
            .bookings
            .iter()
            .position(|b| b.id == id)
            .ok_or(Error::ErrBookingNotFound)?;
        let original = self.bookings.remove(index);

        let shifted = match original.shift(delta_hours) {
            Some(b) => b,
            None => {
                let _ = self.insert(original);
                return Err(Error::ErrInvalidBooking);
            }
        };

        if !self.insert(shifted) {
            let _ = self.insert(original);
            log::error!("unable to update {original} in {}: clash", self.name);
            return Err(Error::ErrBookingConflict);
        }

        log::info!("updated {original} by {delta_hours} hours in {}", self.name);
        Ok(())
    }

    pub fn delete_booking(&mut self, id: u16) -> bool {
        self.clean();
        let before = self.bookings.len();
        self.bookings.retain(|b| b.id != id);
        before != self.bookings.len()
    }

    /// The facility's schedule for the next `days` days including today, as
    /// a bitmap of 3 octets per day: one bit per hour, MSB first, set iff
    /// the hour is booked. Hours are counted from local midnight of the
    /// current day.
    pub fn availability(&self, days: u8) -> Vec<u8> {
        let midnight = Local::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|t| t.and_local_timezone(Local).earliest())
            .unwrap_or_else(Local::now);
        self.availability_from(midnight, days)
    }

    pub(crate) fn availability_from(&self, window_start: DateTime<Local>, days: u8) -> Vec<u8> {
        let mut schedule = vec![0u8; days as usize * 3];
        let total_hours = days as i64 * 24;

        for b in &self.bookings {
            let start: DateTime<Local> = b.start.into();
            let end: DateTime<Local> = b.end.into();
            if end <= window_start {
                continue;
            }

            let mut first_hour = (start - window_start).num_hours();
            let mut last_hour = (end - window_start).num_hours();
            if first_hour < 0 {
                first_hour = 0;
            }
            if last_hour >= total_hours {
                // booking runs past the queried window
                last_hour = total_hours - 1;
            }

            for hour in first_hour..last_hour {
                let byte_index = (hour / 8) as usize;
                let bit_index = 7 - (hour % 8) as u32;
                schedule[byte_index] |= 1 << bit_index;
            }
        }

        schedule
    }
}
