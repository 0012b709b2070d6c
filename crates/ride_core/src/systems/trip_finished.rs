use bevy_ecs::prelude::{Commands, Query, Res, ResMut, With};
use tracing::warn;

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::desk::RideDesk;
use crate::ecs::{OnTrip, TrackedRide};

/// Completes a ride once its estimated duration has elapsed. The ride then
/// waits for the rider's rating and its entity goes away.
pub fn trip_finished_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut desk: ResMut<RideDesk>,
    mut commands: Commands,
    rides: Query<&TrackedRide, With<OnTrip>>,
) {
    if event.0.kind != EventKind::TripFinished {
        return;
    }
    let Some(subject @ EventSubject::Ride(entity)) = event.0.subject else {
        return;
    };
    let Ok(tracked) = rides.get(entity) else {
        return;
    };

    let now = clock.now();
    if let Err(err) = desk.complete(&tracked.ride_id, now) {
        warn!(ride_id = %tracked.ride_id, error = %err, "trip finish ignored");
    }
    clock.cancel_subject(subject);
    commands.entity(entity).despawn();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeskConfig;
    use crate::lifecycle::RideStatus;
    use crate::runner::{run_until_empty, simulation_schedule};
    use crate::test_helpers::{create_test_world, request_tracked_ride};

    #[test]
    fn auto_completion_frees_driver_and_entity() {
        let mut world = create_test_world(DeskConfig::default());
        let (entity, ride_id) = request_tracked_ride(&mut world, "rider_1");
        let mut schedule = simulation_schedule();
        run_until_empty(&mut world, &mut schedule, 10_000);

        assert!(world.get_entity(entity).is_none());
        assert!(world.resource::<SimulationClock>().is_empty());
        let desk = world.resource::<RideDesk>();
        let ride = desk.ride(&ride_id).expect("ride");
        assert_eq!(ride.status(), RideStatus::Completed);
        assert_eq!(desk.awaiting_rating().count(), 1);
        let driver = ride.driver_id().and_then(|id| desk.pool().get(id)).expect("driver");
        assert!(driver.is_available());
    }

    #[test]
    fn without_auto_complete_trip_stays_open() {
        let config = DeskConfig {
            auto_complete: false,
            ..DeskConfig::default()
        };
        let mut world = create_test_world(config);
        let (entity, ride_id) = request_tracked_ride(&mut world, "rider_1");
        let mut schedule = simulation_schedule();
        run_until_empty(&mut world, &mut schedule, 10_000);

        assert!(world.entity(entity).get::<OnTrip>().is_some());
        let desk = world.resource::<RideDesk>();
        assert_eq!(desk.ride(&ride_id).map(|r| r.status()), Some(RideStatus::InProgress));
    }
}
