#[cfg(test)]
mod manager_test;

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::monitor::Monitor;
use super::{Booking, Facility};
use crate::error::{Error, Result};

/// Manager owns every facility and fans every mutation out to the monitor's
/// watchers.
#[derive(Debug, Default)]
pub struct Manager {
    facilities: RwLock<HashMap<String, Facility>>,
    monitor: Monitor,
}

impl Manager {
    pub fn new() -> Self {
        Manager::default()
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub async fn create_facility(&self, name: &str) -> Result<()> {
        let mut facilities = self.facilities.write().await;

        if facilities.contains_key(name) {
            log::error!("attempted to create a facility that already exists: {name}");
            return Err(Error::ErrFacilityExists);
        }
        facilities.insert(name.to_string(), Facility::new(name));
        log::info!("created facility {name}");
        Ok(())
    }

    /// The hourly availability bitmap for the next `days` days.
    pub async fn query_availability(&self, name: &str, days: u8) -> Result<Vec<u8>> {
        let mut facilities = self.facilities.write().await;

        let facility = facilities.get_mut(name).ok_or_else(|| {
            log::error!("facility does not exist: {name}");
            Error::ErrFacilityNotFound
        })?;
        facility.clean();

        self.monitor
            .update(name, &format!("Executing query on {name} for {days} days"))
            .await;
        Ok(facility.availability(days))
    }

    /// Deletes a facility, refusing while bookings remain.
    pub async fn delete_facility(&self, name: &str) -> Result<()> {
        let mut facilities = self.facilities.write().await;

        match facilities.get(name) {
            None => {
                log::error!("attempted to delete a facility that does not exist: {name}");
                return Err(Error::ErrFacilityNotFound);
            }
            Some(facility) if facility.booking_count() > 0 => {
                log::error!("attempted to delete facility {name} with existing bookings");
                self.monitor
                    .update(
                        name,
                        "A deletion was attempted on this facility, but existing bookings remain.",
                    )
                    .await;
                return Err(Error::ErrFacilityHasBookings);
            }
            Some(_) => {}
        }

        facilities.remove(name);
        self.monitor
            .update(name, "This facility has been deleted.")
            .await;
        log::info!("deleted facility {name}");
        self.monitor.clear(name).await;
        Ok(())
    }

    pub async fn make_booking(&self, name: &str, booking: Booking) -> Result<()> {
        let mut facilities = self.facilities.write().await;

        let facility = facilities.get_mut(name).ok_or_else(|| {
            log::error!("attempted to book a facility that does not exist: {name}");
            Error::ErrFacilityNotFound
        })?;

        if let Err(err) = facility.book(booking) {
            self.monitor
                .update(name, &format!("Error attempting to make {booking} at {name}."))
                .await;
            return Err(err);
        }

        log::info!("made {booking} at {name}");
        self.monitor
            .update(name, &format!("Successfully made {booking} at {name}."))
            .await;
        Ok(())
    }

    /// Locates the booking by id across facilities and shifts it.
    pub async fn update_booking_by_id(&self, id: u16, delta_hours: i64) -> Result<()> {
        let mut facilities = self.facilities.write().await;

        for facility in facilities.values_mut() {
            if !facility.has_booking(id) {
                continue;
            }
            let name = facility.name().to_string();
            return match facility.update_booking(id, delta_hours) {
                Ok(()) => {
                    self.monitor
                        .update(
                            &name,
                            &format!("Updated booking {id:#06x} by {delta_hours} hours."),
                        )
                        .await;
                    Ok(())
                }
                Err(err) => {
                    self.monitor
                        .update(
                            &name,
                            &format!("Failed to update booking {id:#06x} by {delta_hours} hours."),
                        )
                        .await;
                    Err(err)
                }
            };
        }

        log::error!("booking {id:#06x} not found");
        Err(Error::ErrBookingNotFound)
    }

    /// Locates the booking by id across facilities and removes it.
    pub async fn delete_booking_by_id(&self, id: u16) -> Result<()> {
        let mut facilities = self.facilities.write().await;

        for facility in facilities.values_mut() {
            if facility.delete_booking(id) {
                let name = facility.name().to_string();
                log::info!("deleted booking {id:#06x} from {name}");
                self.monitor
                    .update(
                        &name,
                        &format!("Successfully deleted booking {id:#06x} from {name}."),
                    )
                    .await;
                return Ok(());
            }
        }

        log::error!("booking {id:#06x} not found");
        Err(Error::ErrBookingNotFound)
    }

    pub async fn facility_count(&self) -> usize {
        self.facilities.read().await.len()
    }
}
