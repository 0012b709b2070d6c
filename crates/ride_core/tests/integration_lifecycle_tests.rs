mod support;

use ride_core::config::DeskConfig;
use ride_core::lifecycle::{transition, CancelledBy, RideEvent, RideRequest, RideStatus};
use ride_core::model::{RideId, UserId};
use ride_core::pricing::{FareTable, RideClass};
use ride_core::routing::RouteEstimate;
use ride_core::test_helpers::{destination, pickup};
use ride_core::RideError;

use support::{desk_with, driver_at};

fn pending() -> RideRequest {
    RideRequest::new(
        RideId::from("ride_001"),
        UserId::from("rider_1"),
        pickup(),
        destination(),
        RideClass::Comfort,
        RouteEstimate::new(3.0, 9),
        &FareTable::default(),
        0,
    )
    .expect("ride")
}

fn accept() -> RideEvent {
    RideEvent::Accept {
        driver_id: UserId::from("driver_1"),
        at: 1,
    }
}

fn cancel() -> RideEvent {
    RideEvent::Cancel {
        by: CancelledBy::Rider,
        at: 9,
    }
}

#[test]
fn happy_path_sets_timestamps() {
    let ride = pending();
    let accepted = transition(&ride, accept()).expect("accept");
    let started = transition(&accepted, RideEvent::DriverArrived { at: 5 }).expect("start");
    let completed = transition(&started, RideEvent::Complete { at: 20 }).expect("complete");

    assert_eq!(ride.status(), RideStatus::Pending);
    assert_eq!(accepted.accepted_at(), Some(1));
    assert_eq!(started.started_at(), Some(5));
    assert_eq!(completed.completed_at(), Some(20));
    assert_eq!(completed.driver_id(), Some(&UserId::from("driver_1")));
    // Price is fixed at creation: 3.50 + 1.80 * 3.0.
    assert!((completed.price() - 8.90).abs() < 1e-9);
}

#[test]
fn out_of_order_events_are_rejected_without_change() {
    let ride = pending();
    for event in [
        RideEvent::DriverArrived { at: 1 },
        RideEvent::Complete { at: 1 },
    ] {
        let err = transition(&ride, event).expect_err("invalid");
        assert!(matches!(err, RideError::InvalidTransition { from: RideStatus::Pending, .. }));
    }

    let accepted = transition(&ride, accept()).expect("accept");
    assert!(transition(&accepted, accept()).is_err());
    assert!(transition(&accepted, RideEvent::Complete { at: 2 }).is_err());
    assert!(transition(
        &accepted,
        RideEvent::Decline {
            driver_id: UserId::from("driver_2")
        }
    )
    .is_err());
}

#[test]
fn cancel_allowed_from_every_open_status() {
    let pending = pending();
    let accepted = transition(&pending, accept()).expect("accept");
    let started = transition(&accepted, RideEvent::DriverArrived { at: 2 }).expect("start");
    for ride in [&pending, &accepted, &started] {
        let cancelled = transition(ride, cancel()).expect("cancel");
        assert_eq!(cancelled.status(), RideStatus::Cancelled);
        assert_eq!(cancelled.cancelled_at(), Some(9));
    }

    let completed = transition(&started, RideEvent::Complete { at: 3 }).expect("complete");
    let cancelled = transition(&pending, cancel()).expect("cancel");
    for terminal in [&completed, &cancelled] {
        let err = transition(terminal, cancel()).expect_err("terminal");
        assert_eq!(
            err,
            RideError::invalid_transition(terminal.id(), terminal.status(), "cancel")
        );
        assert!(transition(terminal, accept()).is_err());
    }
}

#[test]
fn desk_enforces_lifecycle_on_stored_rides() {
    let mut desk = desk_with(
        vec![driver_at("driver_1", 40.7130, -74.0062)],
        DeskConfig::default(),
    );
    let ride_id = desk
        .create_ride_request(UserId::from("rider_1"), pickup(), destination(), RideClass::Xl, 0)
        .expect("ride")
        .id()
        .clone();

    assert!(matches!(
        desk.complete(&ride_id, 1),
        Err(RideError::InvalidTransition { .. })
    ));
    desk.dispatch(&ride_id, 1).expect("dispatch");
    assert!(matches!(
        desk.dispatch(&ride_id, 2),
        Err(RideError::InvalidTransition { from: RideStatus::Accepted, .. })
    ));
    desk.driver_arrived(&ride_id, 3).expect("arrive");
    desk.complete(&ride_id, 4).expect("complete");
    assert!(matches!(
        desk.cancel(&ride_id, CancelledBy::Rider, 5),
        Err(RideError::InvalidTransition { from: RideStatus::Completed, .. })
    ));
    assert_eq!(
        desk.complete(&RideId::from("ride_999"), 6).map(|r| r.status()),
        Err(RideError::UnknownRide(RideId::from("ride_999")))
    );
}
