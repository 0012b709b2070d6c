//! The shared driver registry.
//!
//! The pool owns every driver record. Filtering, selection, and binding for a
//! dispatch happen under a single lock, so two concurrent dispatches can never
//! bind the same driver. Other components read cloned snapshots.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::{RideError, RideResult};
use crate::geo::Location;
use crate::model::{Driver, RideId, UserId};
use crate::spatial::SpatialIndex;

use super::algorithm::MatchingAlgorithm;
use super::dispatch::eligible_distance;
use super::types::{Candidate, DriverMatch, MatchOutcome};

#[derive(Debug, Default)]
struct PoolState {
    drivers: BTreeMap<UserId, Driver>,
    index: SpatialIndex,
}

#[derive(Debug, Default)]
pub struct DriverPool {
    state: Mutex<PoolState>,
}

impl DriverPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_drivers(drivers: impl IntoIterator<Item = Driver>) -> Self {
        let pool = Self::new();
        for driver in drivers {
            pool.insert(driver);
        }
        pool
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // Binding is a single step after all checks, so a poisoned pool is still consistent.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Adds or replaces a driver; returns the previous record.
    pub fn insert(&self, driver: Driver) -> Option<Driver> {
        let mut state = self.lock();
        let id = driver.id().clone();
        state.index.upsert(&id, driver.location());
        state.drivers.insert(id, driver)
    }

    pub fn remove(&self, driver_id: &UserId) -> Option<Driver> {
        let mut state = self.lock();
        state.index.remove(driver_id);
        state.drivers.remove(driver_id)
    }

    pub fn get(&self, driver_id: &UserId) -> Option<Driver> {
        self.lock().drivers.get(driver_id).cloned()
    }

    /// Copy of every driver, ordered by id.
    pub fn snapshot(&self) -> Vec<Driver> {
        self.lock().drivers.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().drivers.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.lock()
            .drivers
            .values()
            .filter(|d| d.can_take_ride())
            .count()
    }

    pub fn set_online(&self, driver_id: &UserId, online: bool) -> RideResult<()> {
        let mut state = self.lock();
        let driver = state
            .drivers
            .get_mut(driver_id)
            .ok_or_else(|| RideError::UnknownDriver(driver_id.clone()))?;
        if online {
            driver.go_online();
            Ok(())
        } else {
            driver.go_offline()
        }
    }

    pub fn update_location(&self, driver_id: &UserId, location: Location) -> RideResult<()> {
        let mut state = self.lock();
        let PoolState { drivers, index } = &mut *state;
        let driver = drivers
            .get_mut(driver_id)
            .ok_or_else(|| RideError::UnknownDriver(driver_id.clone()))?;
        driver.user.current_location = Some(location);
        index.upsert(driver_id, Some(location));
        Ok(())
    }

    /// Selects and binds a driver for `ride_id` atomically.
    pub fn dispatch(
        &self,
        algorithm: &dyn MatchingAlgorithm,
        rider_location: &Location,
        max_radius_km: f64,
        ride_id: &RideId,
        exclude: &[UserId],
    ) -> MatchOutcome {
        let mut state = self.lock();
        let PoolState { drivers, index } = &mut *state;

        let mut candidates: Vec<Candidate> = {
            let lookup: &BTreeMap<UserId, Driver> = drivers;
            let eligible = |driver: &Driver| candidate_for(driver, rider_location, max_radius_km, exclude);
            match index.candidates_within(rider_location, max_radius_km) {
                Some(ids) => ids
                    .iter()
                    .filter_map(|id| lookup.get(id))
                    .filter_map(eligible)
                    .collect(),
                None => lookup.values().filter_map(eligible).collect(),
            }
        };
        candidates.sort_by(|a, b| a.driver_id.cmp(&b.driver_id));
        debug!(
            ride_id = %ride_id,
            candidates = candidates.len(),
            algorithm = algorithm.name(),
            "dispatch candidates"
        );

        let Some(chosen) = algorithm
            .select(&candidates)
            .and_then(|idx| candidates.get(idx))
        else {
            return MatchOutcome::NoDriverAvailable;
        };
        let Some(driver) = drivers.get_mut(&chosen.driver_id) else {
            return MatchOutcome::NoDriverAvailable;
        };
        if driver.bind(ride_id.clone()).is_err() {
            return MatchOutcome::NoDriverAvailable;
        }
        MatchOutcome::Matched(DriverMatch {
            driver: driver.clone(),
            distance_km: chosen.distance_km,
        })
    }

    /// Binds a specific driver (driver-initiated accept).
    ///
    /// The driver must pass the same checks as a dispatch: not in `exclude`,
    /// free, and strictly inside `max_radius_km` of the pickup.
    pub fn claim(
        &self,
        driver_id: &UserId,
        ride_id: &RideId,
        pickup: &Location,
        max_radius_km: f64,
        exclude: &[UserId],
    ) -> RideResult<DriverMatch> {
        let mut state = self.lock();
        let driver = state
            .drivers
            .get_mut(driver_id)
            .ok_or_else(|| RideError::UnknownDriver(driver_id.clone()))?;
        let not_eligible = || RideError::DriverNotEligible {
            driver_id: driver_id.clone(),
            ride_id: ride_id.clone(),
        };
        if exclude.contains(driver_id) {
            return Err(not_eligible());
        }
        if !driver.can_take_ride() {
            return Err(RideError::DriverUnavailable(driver_id.clone()));
        }
        let distance_km = eligible_distance(driver, pickup, max_radius_km).ok_or_else(not_eligible)?;
        driver.bind(ride_id.clone())?;
        Ok(DriverMatch {
            driver: driver.clone(),
            distance_km,
        })
    }

    /// Frees a driver bound to `ride_id`. Returns `false` when the driver is
    /// bound to something else (or nothing), leaving it untouched.
    pub fn release(&self, driver_id: &UserId, ride_id: &RideId) -> RideResult<bool> {
        let mut state = self.lock();
        let driver = state
            .drivers
            .get_mut(driver_id)
            .ok_or_else(|| RideError::UnknownDriver(driver_id.clone()))?;
        if driver.current_ride_id() != Some(ride_id) {
            return Ok(false);
        }
        driver.release();
        Ok(true)
    }
}

fn candidate_for(
    driver: &Driver,
    rider_location: &Location,
    max_radius_km: f64,
    exclude: &[UserId],
) -> Option<Candidate> {
    if exclude.contains(driver.id()) {
        return None;
    }
    eligible_distance(driver, rider_location, max_radius_km).map(|distance_km| Candidate {
        driver_id: driver.id().clone(),
        distance_km,
    })
}
