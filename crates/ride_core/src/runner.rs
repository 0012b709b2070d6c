//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Each step pops the next event from [SimulationClock], inserts it as
//! [CurrentEvent], then runs the schedule. Systems are gated on the event kind.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::systems::{
    arrival_tick::arrival_tick_system, dispatch_attempt::dispatch_attempt_system,
    position_update::position_update_system, trip_finished::trip_finished_system,
};

fn is_kind(event: Option<Res<CurrentEvent>>, kind: EventKind) -> bool {
    event.map(|e| e.0.kind == kind).unwrap_or(false)
}

fn is_dispatch_attempt(event: Option<Res<CurrentEvent>>) -> bool {
    is_kind(event, EventKind::DispatchAttempt)
}

fn is_arrival_tick(event: Option<Res<CurrentEvent>>) -> bool {
    is_kind(event, EventKind::ArrivalTick)
}

fn is_position_update(event: Option<Res<CurrentEvent>>) -> bool {
    is_kind(event, EventKind::PositionUpdate)
}

fn is_trip_finished(event: Option<Res<CurrentEvent>>) -> bool {
    is_kind(event, EventKind::TripFinished)
}

/// Builds the schedule: one system per event kind, then [apply_deferred] so
/// component changes land before the next event.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            dispatch_attempt_system.run_if(is_dispatch_attempt),
            arrival_tick_system.run_if(is_arrival_tick),
            position_update_system.run_if(is_position_update),
            trip_finished_system.run_if(is_trip_finished),
            apply_deferred,
        )
            .chain(),
    );
    schedule
}

/// Runs one step. Returns `false` when the clock is empty.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    true
}

/// Runs steps until the queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Processes every event due at or before `until_ms`, then moves the clock to
/// `until_ms`. Returns the number of steps executed.
pub fn run_until(world: &mut World, schedule: &mut Schedule, until_ms: u64, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps {
        let due = world
            .resource::<SimulationClock>()
            .next_event_time()
            .is_some_and(|ts| ts <= until_ms);
        if !due || !run_next_event(world, schedule) {
            break;
        }
        steps += 1;
    }
    world.resource_mut::<SimulationClock>().advance_to(until_ms);
    steps
}
