use std::time::{Duration, SystemTime};

use super::*;

fn hours(n: u64) -> Duration {
    Duration::from_secs(n * 3600)
}

fn future_slot(id: u16, start_hour: u64, end_hour: u64) -> Booking {
    let base = SystemTime::now() + hours(24);
    Booking::new(id, base + hours(start_hour), base + hours(end_hour)).unwrap()
}

#[tokio::test]
async fn test_create_facility_rejects_duplicates() {
    let manager = Manager::new();

    manager.create_facility("Gym").await.unwrap();
    assert_eq!(
        manager.create_facility("Gym").await,
        Err(Error::ErrFacilityExists)
    );
    assert_eq!(manager.facility_count().await, 1);
}

#[tokio::test]
async fn test_query_unknown_facility() {
    let manager = Manager::new();
    assert_eq!(
        manager.query_availability("Void", 3).await,
        Err(Error::ErrFacilityNotFound)
    );
}

#[tokio::test]
async fn test_booking_lifecycle_across_facilities() {
    let manager = Manager::new();
    manager.create_facility("Gym").await.unwrap();
    manager.create_facility("Pool").await.unwrap();

    manager
        .make_booking("Pool", future_slot(42, 0, 2))
        .await
        .unwrap();

    // located by id without naming the facility
    manager.update_booking_by_id(42, 3).await.unwrap();
    assert_eq!(
        manager.update_booking_by_id(77, 1).await,
        Err(Error::ErrBookingNotFound)
    );

    manager.delete_booking_by_id(42).await.unwrap();
    assert_eq!(
        manager.delete_booking_by_id(42).await,
        Err(Error::ErrBookingNotFound)
    );
}

#[tokio::test]
async fn test_make_booking_conflict() {
    let manager = Manager::new();
    manager.create_facility("Gym").await.unwrap();

    manager
        .make_booking("Gym", future_slot(1, 0, 2))
        .await
        .unwrap();
    assert_eq!(
        manager.make_booking("Gym", future_slot(2, 1, 3)).await,
        Err(Error::ErrBookingConflict)
    );
    assert_eq!(
        manager.make_booking("Void", future_slot(3, 5, 6)).await,
        Err(Error::ErrFacilityNotFound)
    );
}

#[tokio::test]
async fn test_delete_facility_refuses_while_booked() {
    let manager = Manager::new();
    manager.create_facility("Gym").await.unwrap();
    manager
        .make_booking("Gym", future_slot(1, 0, 2))
        .await
        .unwrap();

    assert_eq!(
        manager.delete_facility("Gym").await,
        Err(Error::ErrFacilityHasBookings)
    );

    manager.delete_booking_by_id(1).await.unwrap();
    manager.delete_facility("Gym").await.unwrap();
    assert_eq!(
        manager.delete_facility("Gym").await,
        Err(Error::ErrFacilityNotFound)
    );
    assert_eq!(manager.facility_count().await, 0);
}

#[tokio::test]
async fn test_mutations_notify_watchers() {
    let manager = Manager::new();
    manager.create_facility("Gym").await.unwrap();

    let mut rx = manager.monitor().watch("Gym").await;

    manager
        .make_booking("Gym", future_slot(9, 0, 1))
        .await
        .unwrap();
    let update = rx.recv().await.unwrap();
    assert!(update.contains("Successfully made"), "got: {update}");

    // deleting the facility clears its watchers
    manager.delete_booking_by_id(9).await.unwrap();
    let _ = rx.recv().await.unwrap();
    manager.delete_facility("Gym").await.unwrap();

    // drain the deletion notice, then observe the close
    let mut saw_close = false;
    for _ in 0..4 {
        if rx.recv().await.is_none() {
            saw_close = true;
            break;
        }
    }
    assert!(saw_close, "watcher channel should close on facility delete");
}

#[tokio::test]
async fn test_query_availability_shape() {
    let manager = Manager::new();
    manager.create_facility("Gym").await.unwrap();

    let schedule = manager.query_availability("Gym", 7).await.unwrap();
    assert_eq!(schedule.len(), 7 * 3);
}
