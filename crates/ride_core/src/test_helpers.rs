//! Test fixtures over the sample fleet in [`crate::fixtures`], plus worlds
//! and desks wired up for unit tests, integration tests and benches.

use std::sync::Arc;

use bevy_ecs::prelude::{Entity, World};

use crate::clock::SimulationClock;
use crate::config::DeskConfig;
use crate::desk::RideDesk;
use crate::error::RideResult;
use crate::fixtures::{
    sample_destination, sample_fleet, sample_pickup, sample_rider, sample_rider_location, SAMPLE_RIDER_ID,
};
use crate::geo::{Location, Place};
use crate::matching::DriverPool;
use crate::model::{Driver, RideId, Role, User, UserId};
use crate::pricing::RideClass;
use crate::routing::{FixedRouteEstimator, RouteEstimate};
use crate::simulation::track_ride;

pub const RIDER_ID: &str = SAMPLE_RIDER_ID;

/// Route used by the booking scenario: 5.2 km, 15 minutes.
pub const SCENARIO_ROUTE: RouteEstimate = RouteEstimate {
    distance_km: 5.2,
    duration_minutes: 15,
};

fn location(lat: f64, lng: f64) -> Location {
    Location { lat, lng }
}

fn fixture<T>(built: RideResult<T>) -> T {
    match built {
        Ok(value) => value,
        Err(err) => panic!("sample fixture is invalid: {err}"),
    }
}

pub fn rider() -> User {
    fixture(sample_rider())
}

pub fn rider_location() -> Location {
    fixture(sample_rider_location())
}

pub fn pickup() -> Place {
    fixture(sample_pickup())
}

pub fn destination() -> Place {
    fixture(sample_destination())
}

/// Three drivers; `driver_3` is already bound to `ride_000`.
pub fn mock_fleet() -> Vec<Driver> {
    fixture(sample_fleet())
}

/// `count` idle drivers on a small grid around the rider.
pub fn grid_fleet(count: usize) -> Vec<Driver> {
    (0..count)
        .map(|i| {
            let row = (i / 10) as f64;
            let col = (i % 10) as f64;
            let user = User::new(format!("driver_{i:04}"), format!("Driver {i}"), Role::Driver)
                .with_location(location(40.70 + row * 0.002, -74.02 + col * 0.002));
            match Driver::from_user(user) {
                Ok(driver) => driver,
                Err(err) => panic!("grid driver {i}: {err}"),
            }
        })
        .collect()
}

pub fn mock_pool() -> Arc<DriverPool> {
    Arc::new(DriverPool::from_drivers(mock_fleet()))
}

/// A desk over the mock fleet with the scenario route.
pub fn mock_desk(config: DeskConfig) -> RideDesk {
    RideDesk::new(config, mock_pool()).with_router(Box::new(FixedRouteEstimator(SCENARIO_ROUTE)))
}

/// A world holding the clock and a mock desk, ready for the simulation schedule.
pub fn create_test_world(config: DeskConfig) -> World {
    let mut world = World::new();
    world.insert_resource(SimulationClock::default());
    world.insert_resource(mock_desk(config));
    world
}

/// Books an economy ride for `rider` and spawns its timer entity.
pub fn request_tracked_ride(world: &mut World, rider: &str) -> (Entity, RideId) {
    let now = world.resource::<SimulationClock>().now();
    let ride_id = match world.resource_mut::<RideDesk>().create_ride_request(
        UserId::from(rider),
        pickup(),
        destination(),
        RideClass::Economy,
        now,
    ) {
        Ok(ride) => ride.id().clone(),
        Err(err) => panic!("ride request for {rider} failed: {err}"),
    };
    let entity = track_ride(world, ride_id.clone());
    (entity, ride_id)
}
