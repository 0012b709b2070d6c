//! Driver selection over a slice of drivers.

use crate::geo::{haversine_km, Location};
use crate::model::{Driver, RideId, UserId};

use super::algorithm::{MatchingAlgorithm, NearestFirst};
use super::types::{Candidate, DriverMatch, MatchOutcome};

/// Distance to the rider if `driver` may take the ride, `None` otherwise.
///
/// Eligible means online, available, located, and strictly inside `max_radius_km`.
pub fn eligible_distance(driver: &Driver, rider_location: &Location, max_radius_km: f64) -> Option<f64> {
    if !driver.can_take_ride() {
        return None;
    }
    let distance_km = haversine_km(&driver.location()?, rider_location);
    (distance_km < max_radius_km).then_some(distance_km)
}

/// Picks the nearest eligible driver and binds it to `ride_id`.
///
/// Ties on distance go to the lowest driver id. The chosen driver in
/// `drivers` is marked unavailable with `current_ride_id` set.
pub fn find_driver(
    rider_location: &Location,
    drivers: &mut [Driver],
    max_radius_km: f64,
    ride_id: &RideId,
) -> MatchOutcome {
    find_driver_with(&NearestFirst, rider_location, drivers, max_radius_km, ride_id, &[])
}

/// [`find_driver`] with an explicit algorithm and drivers to skip.
pub fn find_driver_with(
    algorithm: &dyn MatchingAlgorithm,
    rider_location: &Location,
    drivers: &mut [Driver],
    max_radius_km: f64,
    ride_id: &RideId,
    exclude: &[UserId],
) -> MatchOutcome {
    let mut eligible: Vec<(usize, Candidate)> = drivers
        .iter()
        .enumerate()
        .filter(|(_, driver)| !exclude.contains(driver.id()))
        .filter_map(|(slot, driver)| {
            eligible_distance(driver, rider_location, max_radius_km).map(|distance_km| {
                (
                    slot,
                    Candidate {
                        driver_id: driver.id().clone(),
                        distance_km,
                    },
                )
            })
        })
        .collect();
    eligible.sort_by(|(_, a), (_, b)| a.driver_id.cmp(&b.driver_id));

    let candidates: Vec<Candidate> = eligible.iter().map(|(_, c)| c.clone()).collect();
    let Some(choice) = algorithm.select(&candidates) else {
        return MatchOutcome::NoDriverAvailable;
    };
    let Some((slot, candidate)) = eligible.get(choice) else {
        return MatchOutcome::NoDriverAvailable;
    };
    let Some(driver) = drivers.get_mut(*slot) else {
        return MatchOutcome::NoDriverAvailable;
    };
    if driver.bind(ride_id.clone()).is_err() {
        return MatchOutcome::NoDriverAvailable;
    }
    MatchOutcome::Matched(DriverMatch {
        driver: driver.clone(),
        distance_km: candidate.distance_km,
    })
}
