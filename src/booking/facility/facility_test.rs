use std::time::Duration;

use chrono::{Local, TimeZone};

use super::super::Booking;
use super::*;

fn hours(n: u64) -> Duration {
    Duration::from_secs(n * 3600)
}

/// Bookings relative to the current time, so `clean` keeps them.
fn future_slot(id: u16, start_hour: u64, end_hour: u64) -> Booking {
    let base = SystemTime::now() + hours(24);
    Booking::new(id, base + hours(start_hour), base + hours(end_hour)).unwrap()
}

#[test]
fn test_book_and_reject_clashes() {
    let mut facility = Facility::new("Gym");

    facility.book(future_slot(1, 0, 2)).unwrap();
    facility.book(future_slot(2, 2, 4)).unwrap();
    assert_eq!(facility.booking_count(), 2);

    assert_eq!(
        facility.book(future_slot(3, 1, 3)),
        Err(Error::ErrBookingConflict)
    );
    assert_eq!(
        facility.book(future_slot(4, 0, 2)),
        Err(Error::ErrBookingConflict)
    );
    assert_eq!(facility.booking_count(), 2);

    assert!(facility.has_booking(1));
    assert!(facility.has_booking(2));
    assert!(!facility.has_booking(3));
}

#[test]
fn test_bookings_stay_sorted() {
    let mut facility = Facility::new("Pool");

    facility.book(future_slot(3, 6, 8)).unwrap();
    facility.book(future_slot(1, 0, 2)).unwrap();
    facility.book(future_slot(2, 3, 5)).unwrap();

    let starts: Vec<_> = facility.bookings.iter().map(|b| b.start).collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
}

#[test]
fn test_clean_drops_finished_bookings() {
    let mut facility = Facility::new("Court");

    let past_start = SystemTime::now() - hours(10);
    let past = Booking::new(7, past_start, past_start + hours(2)).unwrap();
    facility.bookings.push(past);
    facility.book(future_slot(8, 0, 1)).unwrap();

    assert_eq!(facility.booking_count(), 1);
    assert!(!facility.has_booking(7));
    assert!(facility.has_booking(8));
}

#[test]
fn test_update_booking_moves_and_falls_back() {
    let mut facility = Facility::new("Studio");

    facility.book(future_slot(1, 0, 2)).unwrap();
    facility.book(future_slot(2, 4, 6)).unwrap();

    // 0..2 moved to 2..4 fits between the neighbors
    facility.update_booking(1, 2).unwrap();
    assert_eq!(
        facility.update_booking(99, 1),
        Err(Error::ErrBookingNotFound)
    );

    // moving onto the other booking clashes and restores the original
    assert_eq!(
        facility.update_booking(1, 2),
        Err(Error::ErrBookingConflict)
    );
    assert_eq!(facility.booking_count(), 2);
    assert!(facility.has_booking(1));
}

#[test]
fn test_delete_booking() {
    let mut facility = Facility::new("Hall");
    facility.book(future_slot(1, 0, 2)).unwrap();

    assert!(facility.delete_booking(1));
    assert!(!facility.delete_booking(1));
    assert_eq!(facility.booking_count(), 0);
}

#[test]
fn test_availability_bitmap() {
    let mut facility = Facility::new("Lab");

    let window_start = Local.with_ymd_and_hms(2030, 5, 10, 0, 0, 0).unwrap();
    let base: SystemTime = window_start.into();

    // 09:00-11:00 on day one, 00:00-02:00 on day two
    facility
        .bookings
        .push(Booking::new(1, base + hours(9), base + hours(11)).unwrap());
    facility
        .bookings
        .push(Booking::new(2, base + hours(24), base + hours(26)).unwrap());

    let schedule = facility.availability_from(window_start, 2);
    assert_eq!(schedule.len(), 6);

    // hours 9 and 10: bits 1 and 2 of the second byte (MSB first)
    assert_eq!(schedule[0], 0b0000_0000);
    assert_eq!(schedule[1], 0b0110_0000);
    assert_eq!(schedule[2], 0b0000_0000);

    // hours 24 and 25: top two bits of day two
    assert_eq!(schedule[3], 0b1100_0000);
    assert_eq!(schedule[4], 0b0000_0000);
    assert_eq!(schedule[5], 0b0000_0000);
}

#[test]
fn test_availability_clamps_to_window() {
    let mut facility = Facility::new("Rink");

    let window_start = Local.with_ymd_and_hms(2030, 5, 10, 0, 0, 0).unwrap();
    let base: SystemTime = window_start.into();

    // started before the window, ends one hour in
    facility
        .bookings
        .push(Booking::new(1, base - hours(5), base + hours(1)).unwrap());
    // entirely before the window
    facility
        .bookings
        .push(Booking::new(2, base - hours(8), base - hours(6)).unwrap());

    let schedule = facility.availability_from(window_start, 1);
    assert_eq!(schedule[0], 0b1000_0000);
    assert_eq!(&schedule[1..], &[0, 0]);
}
