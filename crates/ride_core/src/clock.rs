//! Discrete-event clock for the ride timers.
//!
//! Time is simulated milliseconds. Events pop in timestamp order; events
//! scheduled for the same instant pop in the order they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::{Entity, Resource};

pub const ONE_SEC_MS: u64 = 1_000;
pub const ONE_MIN_MS: u64 = 60 * ONE_SEC_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Look for a driver for a pending ride.
    DispatchAttempt,
    /// One step of the pickup countdown.
    ArrivalTick,
    /// Move the assigned driver toward the pickup.
    PositionUpdate,
    /// Trip duration elapsed; complete the ride.
    TripFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSubject {
    Ride(Entity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub seq: u64,
    pub kind: EventKind,
    pub subject: Option<EventSubject>,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap behaves as a min-heap.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event being processed by the current schedule run.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

#[derive(Debug, Default, Resource)]
pub struct SimulationClock {
    now: u64,
    next_seq: u64,
    events: BinaryHeap<Event>,
}

impl SimulationClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedules `kind` at an absolute time. Times in the past are clamped to now.
    pub fn schedule_at(&mut self, timestamp: u64, kind: EventKind, subject: Option<EventSubject>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Event {
            timestamp: timestamp.max(self.now),
            seq,
            kind,
            subject,
        });
    }

    pub fn schedule_in(&mut self, delay_ms: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_at(self.now.saturating_add(delay_ms), kind, subject);
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|e| e.timestamp)
    }

    /// Moves the clock forward without processing events. Never moves backwards
    /// and never skips past a pending event.
    pub fn advance_to(&mut self, timestamp: u64) {
        let limit = self.next_event_time().unwrap_or(u64::MAX);
        self.now = self.now.max(timestamp.min(limit));
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.events.len()
    }

    pub fn has_pending(&self, kind: EventKind, subject: EventSubject) -> bool {
        self.events
            .iter()
            .any(|e| e.kind == kind && e.subject == Some(subject))
    }

    pub fn pending_for(&self, subject: EventSubject) -> usize {
        self.events
            .iter()
            .filter(|e| e.subject == Some(subject))
            .count()
    }

    /// Drops every pending event for `subject`. Returns how many were removed.
    pub fn cancel_subject(&mut self, subject: EventSubject) -> usize {
        self.retain(|e| e.subject != Some(subject))
    }

    /// Drops pending events of one kind for `subject`.
    pub fn cancel_kind_for(&mut self, kind: EventKind, subject: EventSubject) -> usize {
        self.retain(|e| !(e.kind == kind && e.subject == Some(subject)))
    }

    fn retain(&mut self, keep: impl Fn(&Event) -> bool) -> usize {
        let before = self.events.len();
        let kept: Vec<Event> = self.events.drain().filter(|e| keep(e)).collect();
        self.events = BinaryHeap::from(kept);
        before - self.events.len()
    }
}
