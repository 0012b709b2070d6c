#![allow(dead_code)]

use std::sync::Arc;

use ride_core::config::DeskConfig;
use ride_core::geo::{Location, Place};
use ride_core::matching::DriverPool;
use ride_core::model::{Driver, RideId, Role, User, UserId};
use ride_core::pricing::RideClass;
use ride_core::test_helpers::{destination, mock_desk, pickup, RIDER_ID};
use ride_core::{RideDesk, Simulation};

pub fn location(lat: f64, lng: f64) -> Location {
    Location::new(lat, lng).expect("location")
}

pub fn driver_at(id: &str, lat: f64, lng: f64) -> Driver {
    let user = User::new(id, id, Role::Driver).with_location(location(lat, lng));
    Driver::from_user(user).expect("driver")
}

pub fn rider_id() -> UserId {
    UserId::from(RIDER_ID)
}

/// A simulation over the mock fleet.
pub fn mock_simulation(config: DeskConfig) -> Simulation {
    Simulation::new(mock_desk(config))
}

/// Books the standard economy trip for `rider`.
pub fn book(sim: &mut Simulation, rider: &str) -> RideId {
    sim.request_ride(UserId::from(rider), pickup(), destination(), RideClass::Economy)
        .expect("ride request")
}

/// A desk over an explicit set of drivers.
pub fn desk_with(drivers: Vec<Driver>, config: DeskConfig) -> RideDesk {
    RideDesk::new(config, Arc::new(DriverPool::from_drivers(drivers)))
}

pub fn place(address: &str, lat: f64, lng: f64) -> Place {
    Place::new(address, location(lat, lng))
}
