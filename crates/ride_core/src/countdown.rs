//! Pickup countdown: a scheduled task that can be paused, resumed, or cancelled.

use bevy_ecs::prelude::Component;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Running,
    Paused,
    Cancelled,
    Finished,
}

/// Minutes until the driver reaches the pickup, decremented once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub struct Countdown {
    remaining: u32,
    state: TaskState,
}

impl Countdown {
    /// A zero-length countdown starts finished.
    pub fn new(minutes: u32) -> Self {
        let state = if minutes == 0 {
            TaskState::Finished
        } else {
            TaskState::Running
        };
        Self {
            remaining: minutes,
            state,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }

    /// Advances one step while running; returns the state afterwards.
    pub fn tick(&mut self) -> TaskState {
        if self.state == TaskState::Running {
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                self.state = TaskState::Finished;
            }
        }
        self.state
    }

    /// Returns `false` unless the countdown was running.
    pub fn pause(&mut self) -> bool {
        if self.state != TaskState::Running {
            return false;
        }
        self.state = TaskState::Paused;
        true
    }

    /// Returns `false` unless the countdown was paused.
    pub fn resume(&mut self) -> bool {
        if self.state != TaskState::Paused {
            return false;
        }
        self.state = TaskState::Running;
        true
    }

    /// Stops the countdown for good. Finished countdowns stay finished.
    pub fn cancel(&mut self) {
        if self.state != TaskState::Finished {
            self.state = TaskState::Cancelled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_down_to_finished() {
        let mut countdown = Countdown::new(2);
        assert_eq!(countdown.tick(), TaskState::Running);
        assert_eq!(countdown.remaining(), 1);
        assert_eq!(countdown.tick(), TaskState::Finished);
        assert_eq!(countdown.remaining(), 0);
        assert_eq!(countdown.tick(), TaskState::Finished);
    }

    #[test]
    fn paused_countdown_does_not_move() {
        let mut countdown = Countdown::new(3);
        assert!(countdown.pause());
        assert!(!countdown.pause());
        assert_eq!(countdown.tick(), TaskState::Paused);
        assert_eq!(countdown.remaining(), 3);
        assert!(countdown.resume());
        assert_eq!(countdown.tick(), TaskState::Running);
        assert_eq!(countdown.remaining(), 2);
    }

    #[test]
    fn cancel_is_final() {
        let mut countdown = Countdown::new(3);
        countdown.cancel();
        assert!(!countdown.resume());
        assert_eq!(countdown.tick(), TaskState::Cancelled);
        assert_eq!(countdown.remaining(), 3);

        let mut done = Countdown::new(0);
        assert_eq!(done.state(), TaskState::Finished);
        done.cancel();
        assert_eq!(done.state(), TaskState::Finished);
    }
}
