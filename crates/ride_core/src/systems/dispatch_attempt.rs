use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use tracing::{debug, info, warn};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::countdown::Countdown;
use crate::desk::RideDesk;
use crate::ecs::{EnRoute, Searching, TrackedRide};
use crate::lifecycle::CancelledBy;
use crate::matching::MatchOutcome;
use crate::routing::pickup_eta_minutes;

/// Looks for a driver for a searching ride.
///
/// A match starts the arrival countdown and driver movement. No match
/// schedules a retry until the attempt budget runs out, then the system
/// cancels the ride.
pub fn dispatch_attempt_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut desk: ResMut<RideDesk>,
    mut commands: Commands,
    mut rides: Query<(&TrackedRide, &mut Searching)>,
) {
    if event.0.kind != EventKind::DispatchAttempt {
        return;
    }
    let Some(subject @ EventSubject::Ride(entity)) = event.0.subject else {
        return;
    };
    let Ok((tracked, mut searching)) = rides.get_mut(entity) else {
        return;
    };

    searching.attempts += 1;
    let now = clock.now();
    let ride_id = tracked.ride_id.clone();
    let config = desk.config().clone();

    match desk.dispatch(&ride_id, now) {
        Ok(MatchOutcome::Matched(found)) => {
            let pickup = desk.ride(&ride_id).map(|r| r.pickup().location);
            let eta_minutes = match (found.driver.location(), pickup) {
                (Some(at), Some(pickup)) => {
                    pickup_eta_minutes(&at, &pickup, config.driver_speed_kmh)
                }
                _ => 1,
            };
            info!(ride_id = %ride_id, eta_minutes, "arrival countdown started");
            commands
                .entity(entity)
                .remove::<Searching>()
                .insert((
                    EnRoute {
                        driver_id: found.driver.id().clone(),
                    },
                    Countdown::new(eta_minutes),
                ));
            clock.schedule_in(config.arrival_tick_ms(), EventKind::ArrivalTick, Some(subject));
            clock.schedule_in(
                config.position_update_ms(),
                EventKind::PositionUpdate,
                Some(subject),
            );
        }
        Ok(MatchOutcome::NoDriverAvailable) => {
            if searching.attempts < config.max_dispatch_attempts {
                debug!(ride_id = %ride_id, attempts = searching.attempts, "retrying dispatch");
                clock.schedule_in(
                    config.dispatch_retry_ms(),
                    EventKind::DispatchAttempt,
                    Some(subject),
                );
                return;
            }
            warn!(ride_id = %ride_id, attempts = searching.attempts, "search abandoned");
            if let Err(err) = desk.cancel(&ride_id, CancelledBy::System, now) {
                warn!(ride_id = %ride_id, error = %err, "could not cancel abandoned ride");
            }
            clock.cancel_subject(subject);
            commands.entity(entity).despawn();
        }
        Err(err) => {
            warn!(ride_id = %ride_id, error = %err, "dispatch skipped");
            commands.entity(entity).remove::<Searching>();
        }
    }
}
