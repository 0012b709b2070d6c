use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::{debug, warn};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::desk::RideDesk;
use crate::ecs::{EnRoute, OnTrip, TrackedRide};

/// Moves the assigned driver one step toward the pickup (en route) or the
/// destination (on trip). Stops rescheduling once the target is reached.
pub fn position_update_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    desk: Res<RideDesk>,
    rides: Query<(&TrackedRide, Option<&EnRoute>, Option<&OnTrip>)>,
) {
    if event.0.kind != EventKind::PositionUpdate {
        return;
    }
    let Some(subject @ EventSubject::Ride(entity)) = event.0.subject else {
        return;
    };
    let Ok((tracked, en_route, on_trip)) = rides.get(entity) else {
        return;
    };
    let Some(ride) = desk.ride(&tracked.ride_id) else {
        return;
    };
    let (driver_id, target) = match (en_route, on_trip) {
        (Some(en_route), _) => (&en_route.driver_id, ride.pickup().location),
        (None, Some(on_trip)) => (&on_trip.driver_id, ride.destination().location),
        (None, None) => return,
    };
    let Some(here) = desk.pool().get(driver_id).and_then(|d| d.location()) else {
        return;
    };

    let step_km = desk.config().position_step_km();
    let remaining_km = here.distance_km(&target);
    let arrived = remaining_km <= step_km;
    let next = if arrived {
        target
    } else {
        here.toward(&target, step_km / remaining_km)
    };
    if let Err(err) = desk.pool().update_location(driver_id, next) {
        warn!(ride_id = %tracked.ride_id, error = %err, "position update dropped");
        return;
    }
    debug!(
        ride_id = %tracked.ride_id,
        driver_id = %driver_id,
        remaining_km = (remaining_km - step_km).max(0.0),
        "driver moved"
    );
    if !arrived {
        clock.schedule_in(
            desk.config().position_update_ms(),
            EventKind::PositionUpdate,
            Some(subject),
        );
    }
}
