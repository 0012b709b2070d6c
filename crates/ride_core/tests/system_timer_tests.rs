mod support;

use ride_core::clock::{ONE_MIN_MS, ONE_SEC_MS};
use ride_core::config::DeskConfig;
use ride_core::countdown::TaskState;
use ride_core::lifecycle::{CancelledBy, RideStatus};
use ride_core::model::UserId;

use support::{book, mock_simulation};

#[test]
fn cancel_clears_timers_in_every_phase() {
    let config = DeskConfig {
        auto_complete: false,
        ..DeskConfig::default()
    };

    // Searching.
    let mut sim = mock_simulation(config.clone());
    let ride_id = book(&mut sim, "rider_1");
    sim.cancel_ride(&ride_id, CancelledBy::Rider).expect("cancel");
    assert_eq!(sim.pending_events_for(&ride_id), 0);
    assert!(sim.clock().is_empty());

    // Driver en route.
    let mut sim = mock_simulation(config.clone());
    let ride_id = book(&mut sim, "rider_1");
    sim.run_for(30 * ONE_SEC_MS);
    assert_eq!(sim.arrival_state(&ride_id), Some(TaskState::Running));
    sim.cancel_ride(&ride_id, CancelledBy::Driver).expect("cancel");
    assert_eq!(sim.pending_events_for(&ride_id), 0);
    assert_eq!(sim.arrival_state(&ride_id), None);

    // On trip.
    let mut sim = mock_simulation(config);
    let ride_id = book(&mut sim, "rider_1");
    while sim.ride(&ride_id).map(|r| r.status()) != Some(RideStatus::InProgress) {
        assert!(sim.step(), "ride should reach in_progress");
    }
    sim.cancel_ride(&ride_id, CancelledBy::Rider).expect("cancel");
    assert!(sim.clock().is_empty());
    let archived = sim.ride(&ride_id).expect("archived");
    assert_eq!(archived.status(), RideStatus::Cancelled);
    assert!(archived.started_at().is_some());
}

#[test]
fn cancelled_ride_ignores_late_steps() {
    let mut sim = mock_simulation(DeskConfig::default());
    let ride_id = book(&mut sim, "rider_1");
    sim.run_for(5 * ONE_SEC_MS);
    sim.cancel_ride(&ride_id, CancelledBy::Rider).expect("cancel");

    assert!(!sim.step());
    sim.run_for(30 * ONE_MIN_MS);
    assert_eq!(sim.ride(&ride_id).map(|r| r.status()), Some(RideStatus::Cancelled));
    assert_eq!(sim.desk().history().len(), 1);
    assert!(sim.cancel_ride(&ride_id, CancelledBy::Rider).is_err());
}

#[test]
fn eta_counts_down_one_minute_per_tick() {
    let config = DeskConfig {
        driver_speed_kmh: 4.0,
        ..DeskConfig::default()
    };
    let mut sim = mock_simulation(config);
    let ride_id = book(&mut sim, "rider_1");
    sim.run_for(3 * ONE_SEC_MS);
    let start = sim.eta_minutes(&ride_id).expect("eta");
    assert!(start >= 3);

    sim.run_for(ONE_MIN_MS);
    assert_eq!(sim.eta_minutes(&ride_id), Some(start - 1));
    sim.run_for(ONE_MIN_MS);
    assert_eq!(sim.eta_minutes(&ride_id), Some(start - 2));

    sim.pause_arrival(&ride_id).expect("pause");
    sim.run_for(5 * ONE_MIN_MS);
    assert_eq!(sim.eta_minutes(&ride_id), Some(start - 2));
    assert!(!sim.pause_arrival(&ride_id).expect("second pause"));

    sim.resume_arrival(&ride_id).expect("resume");
    sim.run_until_idle();
    assert_eq!(sim.ride(&ride_id).map(|r| r.status()), Some(RideStatus::Completed));
}

#[test]
fn search_gives_up_after_retry_budget() {
    let config = DeskConfig {
        max_radius_km: 0.05,
        ..DeskConfig::default()
    };
    let mut sim = mock_simulation(config);
    let ride_id = book(&mut sim, "rider_1");
    sim.run_until_idle();

    // Attempts at 3 s, 13 s and 23 s.
    assert_eq!(sim.now(), 23 * ONE_SEC_MS);
    let ride = sim.ride(&ride_id).expect("archived");
    assert_eq!(ride.status(), RideStatus::Cancelled);
    assert_eq!(ride.cancelled_by(), Some(CancelledBy::System));
    assert_eq!(sim.desk().telemetry().no_driver_outcomes, 3);
}

#[test]
fn declined_driver_is_skipped_by_timed_dispatch() {
    let mut sim = mock_simulation(DeskConfig::default());
    let ride_id = book(&mut sim, "rider_1");
    sim.decline(&ride_id, &UserId::from("driver_2")).expect("decline");
    sim.run_for(3 * ONE_SEC_MS);

    let ride = sim.ride(&ride_id).expect("ride");
    assert_eq!(ride.driver_id(), Some(&UserId::from("driver_1")));
    assert_eq!(ride.declined_by(), [UserId::from("driver_2")]);
}
