//! Desk counters for dashboards and demo summaries.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeskTelemetry {
    pub rides_requested: u64,
    pub rides_matched: u64,
    /// Dispatch attempts that found no eligible driver.
    pub no_driver_outcomes: u64,
    pub rides_declined: u64,
    pub rides_started: u64,
    pub rides_completed: u64,
    pub rides_cancelled: u64,
    pub rides_rated: u64,
    pub rides_charged: u64,
    /// Completed rides the wallet could not charge.
    pub payment_failures: u64,
}

impl DeskTelemetry {
    /// Share of dispatch attempts that found a driver.
    pub fn match_rate(&self) -> Option<f64> {
        let attempts = self.rides_matched + self.no_driver_outcomes;
        if attempts == 0 {
            return None;
        }
        Some(self.rides_matched as f64 / attempts as f64)
    }
}
