mod support;

use std::collections::HashSet;
use std::sync::Arc;

use ride_core::matching::{DriverPool, MatchOutcome, NearestFirst, SeededRandom};
use ride_core::model::{RideId, UserId};
use ride_core::test_helpers::{grid_fleet, rider_location};

fn dispatch_from_threads(pool: &Arc<DriverPool>, riders: usize, seeded: bool) -> Vec<MatchOutcome> {
    let pickup = rider_location();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..riders)
            .map(|i| {
                let pool = Arc::clone(pool);
                scope.spawn(move || {
                    let ride_id = RideId::new(format!("ride_{i:03}"));
                    if seeded {
                        let algorithm = SeededRandom::new(i as u64);
                        pool.dispatch(&algorithm, &pickup, 5.0, &ride_id, &[])
                    } else {
                        pool.dispatch(&NearestFirst, &pickup, 5.0, &ride_id, &[])
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("dispatch thread"))
            .collect()
    })
}

fn matched_ids(outcomes: &[MatchOutcome]) -> Vec<UserId> {
    outcomes
        .iter()
        .filter_map(|o| o.driver().map(|d| d.id().clone()))
        .collect()
}

#[test]
fn concurrent_dispatch_never_double_books() {
    let pool = Arc::new(DriverPool::from_drivers(grid_fleet(20)));
    let outcomes = dispatch_from_threads(&pool, 32, false);

    let ids = matched_ids(&outcomes);
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(ids.len(), 20);
    assert_eq!(unique.len(), ids.len());
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == MatchOutcome::NoDriverAvailable)
            .count(),
        12
    );
    assert_eq!(pool.available_count(), 0);

    for driver in pool.snapshot() {
        let ride = driver.current_ride_id().expect("bound");
        assert!(outcomes
            .iter()
            .filter_map(MatchOutcome::driver)
            .any(|d| d.id() == driver.id() && d.current_ride_id() == Some(ride)));
    }
}

#[test]
fn concurrent_random_dispatch_never_double_books() {
    let pool = Arc::new(DriverPool::from_drivers(grid_fleet(10)));
    let outcomes = dispatch_from_threads(&pool, 10, true);
    let ids = matched_ids(&outcomes);
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(ids.len(), 10);
    assert_eq!(unique.len(), 10);
}

#[test]
fn sequential_dispatch_releases_and_rebinds() {
    let pool = DriverPool::from_drivers(vec![support::driver_at("driver_1", 40.7130, -74.0062)]);
    let first = RideId::from("ride_001");
    let second = RideId::from("ride_002");
    let outcome = pool.dispatch(&NearestFirst, &rider_location(), 5.0, &first, &[]);
    assert!(outcome.is_matched());
    assert_eq!(
        pool.dispatch(&NearestFirst, &rider_location(), 5.0, &second, &[]),
        MatchOutcome::NoDriverAvailable
    );
    assert!(pool.release(&UserId::from("driver_1"), &first).expect("release"));
    assert!(pool
        .dispatch(&NearestFirst, &rider_location(), 5.0, &second, &[])
        .is_matched());
}
