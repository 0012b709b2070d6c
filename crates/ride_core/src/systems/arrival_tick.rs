use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use tracing::{debug, warn};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock, ONE_MIN_MS};
use crate::countdown::{Countdown, TaskState};
use crate::desk::RideDesk;
use crate::ecs::{EnRoute, OnTrip, TrackedRide};

/// One step of the pickup countdown. At zero the driver has arrived and the
/// trip starts.
pub fn arrival_tick_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut desk: ResMut<RideDesk>,
    mut commands: Commands,
    mut rides: Query<(&TrackedRide, &EnRoute, &mut Countdown)>,
) {
    if event.0.kind != EventKind::ArrivalTick {
        return;
    }
    let Some(subject @ EventSubject::Ride(entity)) = event.0.subject else {
        return;
    };
    let Ok((tracked, en_route, mut countdown)) = rides.get_mut(entity) else {
        return;
    };

    let config = desk.config().clone();
    match countdown.tick() {
        TaskState::Running => {
            debug!(ride_id = %tracked.ride_id, eta_minutes = countdown.remaining(), "driver approaching");
            clock.schedule_in(config.arrival_tick_ms(), EventKind::ArrivalTick, Some(subject));
        }
        TaskState::Finished => {
            let now = clock.now();
            let duration_minutes = match desk.driver_arrived(&tracked.ride_id, now) {
                Ok(ride) => ride.estimated_duration_minutes(),
                Err(err) => {
                    warn!(ride_id = %tracked.ride_id, error = %err, "arrival ignored");
                    return;
                }
            };
            commands
                .entity(entity)
                .remove::<(EnRoute, Countdown)>()
                .insert(OnTrip {
                    driver_id: en_route.driver_id.clone(),
                });
            if config.auto_complete {
                clock.schedule_in(
                    u64::from(duration_minutes).saturating_mul(ONE_MIN_MS),
                    EventKind::TripFinished,
                    Some(subject),
                );
            }
            if !clock.has_pending(EventKind::PositionUpdate, subject) {
                clock.schedule_in(
                    config.position_update_ms(),
                    EventKind::PositionUpdate,
                    Some(subject),
                );
            }
        }
        TaskState::Paused | TaskState::Cancelled => {}
    }
}
