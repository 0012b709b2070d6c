//! Components carried by simulated ride entities.
//!
//! One entity per open ride. Phase markers mirror the ride status:
//! [`Searching`] while pending, [`EnRoute`] plus a
//! [`Countdown`](crate::countdown::Countdown) while accepted, [`OnTrip`]
//! while in progress. The entity is despawned once the ride closes.

use bevy_ecs::prelude::Component;

use crate::model::{RideId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Component)]
pub struct TrackedRide {
    pub ride_id: RideId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Component)]
pub struct Searching {
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Component)]
pub struct EnRoute {
    pub driver_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Component)]
pub struct OnTrip {
    pub driver_id: UserId,
}
