//! Simulation facade: a desk driven by the discrete-event clock.
//!
//! Each ride gets an entity that carries its timers. Requesting a ride
//! schedules the first dispatch attempt; the systems in [`crate::systems`]
//! take it from there. Caller actions (cancel, pause, rate) go through here so
//! that the desk and the pending timers never disagree.

use std::collections::HashMap;

use bevy_ecs::prelude::{Entity, Schedule, World};
use tracing::{debug, info};

use crate::clock::{EventKind, EventSubject, SimulationClock};
use crate::countdown::{Countdown, TaskState};
use crate::desk::RideDesk;
use crate::ecs::{EnRoute, OnTrip, Searching, TrackedRide};
use crate::error::{RideError, RideResult};
use crate::geo::Place;
use crate::lifecycle::{CancelledBy, Rating, RideRequest, RideStatus};
use crate::model::{RideId, UserId};
use crate::pricing::RideClass;
use crate::routing::{pickup_eta_minutes, RouteEstimate};
use crate::runner::{run_next_event, run_until, run_until_empty, simulation_schedule};

/// Upper bound on steps for the run helpers.
pub const MAX_STEPS: usize = 1_000_000;

pub struct Simulation {
    world: World,
    schedule: Schedule,
    entities: HashMap<RideId, Entity>,
}

impl Simulation {
    pub fn new(desk: RideDesk) -> Self {
        let mut world = World::new();
        world.insert_resource(SimulationClock::default());
        world.insert_resource(desk);
        Self {
            world,
            schedule: simulation_schedule(),
            entities: HashMap::new(),
        }
    }

    pub fn now(&self) -> u64 {
        self.clock().now()
    }

    pub fn clock(&self) -> &SimulationClock {
        self.world.resource::<SimulationClock>()
    }

    pub fn desk(&self) -> &RideDesk {
        self.world.resource::<RideDesk>()
    }

    pub fn ride(&self, ride_id: &RideId) -> Option<&RideRequest> {
        self.desk().ride(ride_id)
    }

    /// Books a ride and schedules its first dispatch attempt after the search delay.
    pub fn request_ride(
        &mut self,
        rider_id: UserId,
        pickup: Place,
        destination: Place,
        class: RideClass,
    ) -> RideResult<RideId> {
        let now = self.now();
        let ride_id = self
            .world
            .resource_mut::<RideDesk>()
            .create_ride_request(rider_id, pickup, destination, class, now)?
            .id()
            .clone();
        self.track(ride_id.clone());
        Ok(ride_id)
    }

    /// [`Simulation::request_ride`] with an explicit route.
    pub fn request_ride_with_route(
        &mut self,
        rider_id: UserId,
        pickup: Place,
        destination: Place,
        class: RideClass,
        route: RouteEstimate,
    ) -> RideResult<RideId> {
        let now = self.now();
        let ride_id = self
            .world
            .resource_mut::<RideDesk>()
            .create_ride_request_with_route(rider_id, pickup, destination, class, route, now)?
            .id()
            .clone();
        self.track(ride_id.clone());
        Ok(ride_id)
    }

    fn track(&mut self, ride_id: RideId) {
        let entity = track_ride(&mut self.world, ride_id.clone());
        self.entities.insert(ride_id, entity);
    }

    /// Processes one event. Returns `false` when nothing is scheduled.
    pub fn step(&mut self) -> bool {
        let ran = run_next_event(&mut self.world, &mut self.schedule);
        self.forget_finished();
        ran
    }

    /// Runs until no timers remain.
    pub fn run_until_idle(&mut self) -> usize {
        let steps = run_until_empty(&mut self.world, &mut self.schedule, MAX_STEPS);
        self.forget_finished();
        steps
    }

    /// Runs every event due in the next `duration_ms` and moves the clock forward.
    pub fn run_for(&mut self, duration_ms: u64) -> usize {
        let until = self.now().saturating_add(duration_ms);
        let steps = run_until(&mut self.world, &mut self.schedule, until, MAX_STEPS);
        self.forget_finished();
        steps
    }

    /// Rides that still have a timer entity.
    pub fn tracked_rides(&self) -> usize {
        self.entities.len()
    }

    /// Drops map entries whose entity a system despawned.
    fn forget_finished(&mut self) {
        let world = &self.world;
        self.entities
            .retain(|_, entity| world.get_entity(*entity).is_some());
    }

    /// Pending timer events for a ride.
    pub fn pending_events_for(&self, ride_id: &RideId) -> usize {
        self.entities
            .get(ride_id)
            .map(|entity| self.clock().pending_for(EventSubject::Ride(*entity)))
            .unwrap_or(0)
    }

    fn live_entity(&self, ride_id: &RideId) -> Option<Entity> {
        let entity = *self.entities.get(ride_id)?;
        self.world.get_entity(entity).map(|_| entity)
    }

    /// Minutes left on the pickup countdown, while the driver is en route.
    pub fn eta_minutes(&self, ride_id: &RideId) -> Option<u32> {
        let entity = self.live_entity(ride_id)?;
        self.world.get::<Countdown>(entity).map(Countdown::remaining)
    }

    pub fn arrival_state(&self, ride_id: &RideId) -> Option<TaskState> {
        let entity = self.live_entity(ride_id)?;
        self.world.get::<Countdown>(entity).map(Countdown::state)
    }

    /// Cancels the ride and every timer attached to it.
    pub fn cancel_ride(&mut self, ride_id: &RideId, by: CancelledBy) -> RideResult<RideRequest> {
        let now = self.now();
        let ride = self.world.resource_mut::<RideDesk>().cancel(ride_id, by, now)?;
        self.drop_timers(ride_id);
        Ok(ride)
    }

    /// Freezes the arrival countdown and driver movement.
    pub fn pause_arrival(&mut self, ride_id: &RideId) -> RideResult<bool> {
        let entity = self.en_route_entity(ride_id)?;
        let paused = self
            .world
            .get_mut::<Countdown>(entity)
            .map(|mut countdown| countdown.pause())
            .unwrap_or(false);
        if paused {
            let subject = EventSubject::Ride(entity);
            let mut clock = self.world.resource_mut::<SimulationClock>();
            clock.cancel_kind_for(EventKind::ArrivalTick, subject);
            clock.cancel_kind_for(EventKind::PositionUpdate, subject);
            debug!(ride_id = %ride_id, "arrival paused");
        }
        Ok(paused)
    }

    /// Restarts a paused countdown with a fresh tick interval.
    pub fn resume_arrival(&mut self, ride_id: &RideId) -> RideResult<bool> {
        let entity = self.en_route_entity(ride_id)?;
        let resumed = self
            .world
            .get_mut::<Countdown>(entity)
            .map(|mut countdown| countdown.resume())
            .unwrap_or(false);
        if resumed {
            self.schedule_pickup_timers(entity);
            debug!(ride_id = %ride_id, "arrival resumed");
        }
        Ok(resumed)
    }

    /// Accepts a pending ride on behalf of a driver and starts the pickup timers.
    pub fn accept_as_driver(&mut self, ride_id: &RideId, driver_id: &UserId) -> RideResult<()> {
        let now = self.now();
        let (pickup, speed) = {
            let mut desk = self.world.resource_mut::<RideDesk>();
            let pickup = desk.accept_as_driver(ride_id, driver_id, now)?.pickup().location;
            (pickup, desk.config().driver_speed_kmh)
        };
        let eta_minutes = self
            .desk()
            .pool()
            .get(driver_id)
            .and_then(|d| d.location())
            .map(|at| pickup_eta_minutes(&at, &pickup, speed))
            .unwrap_or(1);

        let Some(entity) = self.live_entity(ride_id) else {
            return Ok(());
        };
        self.world
            .resource_mut::<SimulationClock>()
            .cancel_kind_for(EventKind::DispatchAttempt, EventSubject::Ride(entity));
        self.world.entity_mut(entity).remove::<Searching>().insert((
            EnRoute {
                driver_id: driver_id.clone(),
            },
            Countdown::new(eta_minutes),
        ));
        self.schedule_pickup_timers(entity);
        Ok(())
    }

    /// The driver passes on a pending ride; dispatch will skip them.
    pub fn decline(&mut self, ride_id: &RideId, driver_id: &UserId) -> RideResult<()> {
        self.world
            .resource_mut::<RideDesk>()
            .decline(ride_id, driver_id)?;
        Ok(())
    }

    /// Completes an in-progress ride now, ahead of (or instead of) auto-completion.
    pub fn complete_ride(&mut self, ride_id: &RideId) -> RideResult<RideRequest> {
        let now = self.now();
        let ride = self
            .world
            .resource_mut::<RideDesk>()
            .complete(ride_id, now)?
            .clone();
        self.drop_timers(ride_id);
        Ok(ride)
    }

    /// Rates a completed ride (1 to 5 stars) and archives it.
    pub fn rate_ride(&mut self, ride_id: &RideId, stars: u8, feedback: Option<String>) -> RideResult<()> {
        let rating = Rating::new(stars)?;
        self.world
            .resource_mut::<RideDesk>()
            .record_completion(ride_id, Some(rating), feedback)
    }

    pub fn skip_rating(&mut self, ride_id: &RideId) -> RideResult<()> {
        self.world.resource_mut::<RideDesk>().skip_rating(ride_id)
    }

    /// Tops up a rider's wallet; returns the new balance.
    pub fn add_funds(&mut self, user_id: &UserId, amount: f64) -> RideResult<f64> {
        let now = self.now();
        self.world
            .resource_mut::<RideDesk>()
            .wallet_mut()
            .add_funds(user_id, amount, now)
    }

    fn en_route_entity(&self, ride_id: &RideId) -> RideResult<Entity> {
        let entity = self.live_entity(ride_id);
        if let Some(entity) = entity.filter(|e| self.world.get::<EnRoute>(*e).is_some()) {
            return Ok(entity);
        }
        match self.ride(ride_id) {
            Some(ride) => Err(RideError::invalid_transition(
                ride_id,
                ride.status(),
                "pause",
            )),
            None => Err(RideError::UnknownRide(ride_id.clone())),
        }
    }

    fn schedule_pickup_timers(&mut self, entity: Entity) {
        let (tick_ms, position_ms) = {
            let config = self.desk().config();
            (config.arrival_tick_ms(), config.position_update_ms())
        };
        let subject = EventSubject::Ride(entity);
        let mut clock = self.world.resource_mut::<SimulationClock>();
        clock.schedule_in(tick_ms, EventKind::ArrivalTick, Some(subject));
        clock.schedule_in(position_ms, EventKind::PositionUpdate, Some(subject));
    }

    fn drop_timers(&mut self, ride_id: &RideId) {
        let Some(entity) = self.entities.remove(ride_id) else {
            return;
        };
        if self.world.get_entity(entity).is_none() {
            return;
        }
        if let Some(mut countdown) = self.world.get_mut::<Countdown>(entity) {
            countdown.cancel();
        }
        let dropped = self
            .world
            .resource_mut::<SimulationClock>()
            .cancel_subject(EventSubject::Ride(entity));
        self.world.despawn(entity);
        info!(ride_id = %ride_id, dropped_events = dropped, "ride timers cleared");
    }

    /// Whether the ride still has a timer entity in a given phase.
    pub fn phase(&self, ride_id: &RideId) -> Option<RideStatus> {
        let entity = self.live_entity(ride_id)?;
        if self.world.get::<Searching>(entity).is_some() {
            Some(RideStatus::Pending)
        } else if self.world.get::<EnRoute>(entity).is_some() {
            Some(RideStatus::Accepted)
        } else if self.world.get::<OnTrip>(entity).is_some() {
            Some(RideStatus::InProgress)
        } else {
            None
        }
    }
}

/// Spawns the timer entity for an open ride and schedules its first dispatch
/// attempt after the search delay.
pub fn track_ride(world: &mut World, ride_id: RideId) -> Entity {
    let delay_ms = world.resource::<RideDesk>().config().search_delay_ms();
    let entity = world
        .spawn((TrackedRide { ride_id }, Searching::default()))
        .id();
    world.resource_mut::<SimulationClock>().schedule_in(
        delay_ms,
        EventKind::DispatchAttempt,
        Some(EventSubject::Ride(entity)),
    );
    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ONE_MIN_MS, ONE_SEC_MS};
    use crate::config::DeskConfig;
    use crate::test_helpers::{destination, mock_desk, pickup};

    fn booked(config: DeskConfig) -> (Simulation, RideId) {
        let mut sim = Simulation::new(mock_desk(config));
        let ride_id = sim
            .request_ride("rider_1".into(), pickup(), destination(), RideClass::Economy)
            .expect("ride");
        (sim, ride_id)
    }

    #[test]
    fn request_schedules_dispatch_after_search_delay() {
        let (sim, ride_id) = booked(DeskConfig::default());
        assert_eq!(sim.clock().next_event_time(), Some(3 * ONE_SEC_MS));
        assert_eq!(sim.pending_events_for(&ride_id), 1);
        assert_eq!(sim.phase(&ride_id), Some(RideStatus::Pending));
    }

    #[test]
    fn cancel_leaves_no_timers() {
        let (mut sim, ride_id) = booked(DeskConfig::default());
        sim.run_for(5 * ONE_SEC_MS);
        assert_eq!(sim.phase(&ride_id), Some(RideStatus::Accepted));
        assert!(sim.pending_events_for(&ride_id) >= 2);

        let cancelled = sim.cancel_ride(&ride_id, CancelledBy::Rider).expect("cancel");
        assert_eq!(cancelled.status(), RideStatus::Cancelled);
        assert_eq!(sim.pending_events_for(&ride_id), 0);
        assert!(sim.clock().is_empty());
        assert_eq!(sim.phase(&ride_id), None);
        assert_eq!(sim.desk().pool().available_count(), 2);
        assert_eq!(sim.tracked_rides(), 0);
    }

    #[test]
    fn finished_rides_are_no_longer_tracked() {
        let (mut sim, first) = booked(DeskConfig::default());
        assert_eq!(sim.tracked_rides(), 1);
        sim.run_until_idle();
        assert_eq!(sim.ride(&first).map(RideRequest::status), Some(RideStatus::Completed));
        assert_eq!(sim.tracked_rides(), 0);
        sim.skip_rating(&first).expect("skip");

        // An empty fleet makes every dispatch attempt miss until the search is abandoned.
        let mut sim = Simulation::new(RideDesk::new(
            DeskConfig::default(),
            std::sync::Arc::new(crate::matching::DriverPool::new()),
        ));
        let abandoned = sim
            .request_ride("rider_1".into(), pickup(), destination(), RideClass::Economy)
            .expect("ride");
        while sim.step() {}
        assert_eq!(sim.ride(&abandoned).map(RideRequest::status), Some(RideStatus::Cancelled));
        assert_eq!(sim.tracked_rides(), 0);
        assert_eq!(sim.pending_events_for(&abandoned), 0);
    }

    #[test]
    fn paused_eta_does_not_move() {
        let config = DeskConfig {
            driver_speed_kmh: 5.0,
            ..DeskConfig::default()
        };
        let (mut sim, ride_id) = booked(config);
        sim.run_for(5 * ONE_SEC_MS);
        let eta = sim.eta_minutes(&ride_id).expect("eta");
        assert!(eta > 2);

        assert!(sim.pause_arrival(&ride_id).expect("pause"));
        assert_eq!(sim.arrival_state(&ride_id), Some(TaskState::Paused));
        sim.run_for(10 * ONE_MIN_MS);
        assert_eq!(sim.eta_minutes(&ride_id), Some(eta));
        assert_eq!(sim.pending_events_for(&ride_id), 0);

        assert!(sim.resume_arrival(&ride_id).expect("resume"));
        sim.run_for(ONE_MIN_MS);
        assert_eq!(sim.eta_minutes(&ride_id), Some(eta - 1));
    }

    #[test]
    fn pause_requires_driver_en_route() {
        let (mut sim, ride_id) = booked(DeskConfig::default());
        assert!(matches!(
            sim.pause_arrival(&ride_id),
            Err(RideError::InvalidTransition { .. })
        ));
        assert_eq!(
            sim.pause_arrival(&RideId::from("ride_404")),
            Err(RideError::UnknownRide(RideId::from("ride_404")))
        );
    }

    #[test]
    fn driver_accept_starts_pickup_timers() {
        let (mut sim, ride_id) = booked(DeskConfig::default());
        sim.accept_as_driver(&ride_id, &UserId::from("driver_1"))
            .expect("accept");
        assert_eq!(sim.phase(&ride_id), Some(RideStatus::Accepted));
        assert_eq!(
            sim.ride(&ride_id).and_then(|r| r.driver_id().cloned()),
            Some(UserId::from("driver_1"))
        );
        assert!(!sim
            .clock()
            .has_pending(EventKind::DispatchAttempt, EventSubject::Ride(sim.entities[&ride_id])));
        assert!(sim.eta_minutes(&ride_id).is_some());
    }

    #[test]
    fn manual_completion_then_rating() {
        let config = DeskConfig {
            auto_complete: false,
            ..DeskConfig::default()
        };
        let (mut sim, ride_id) = booked(config);
        sim.run_until_idle();
        assert_eq!(sim.phase(&ride_id), Some(RideStatus::InProgress));

        let done = sim.complete_ride(&ride_id).expect("complete");
        assert_eq!(done.status(), RideStatus::Completed);
        assert_eq!(sim.phase(&ride_id), None);
        assert_eq!(sim.rate_ride(&ride_id, 6, None), Err(RideError::InvalidRating(6)));
        sim.rate_ride(&ride_id, 4, Some("smooth".into())).expect("rate");
        assert_eq!(sim.desk().history().len(), 1);
    }
}
