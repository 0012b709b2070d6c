use serde::Serialize;

use crate::model::{Driver, UserId};

/// An eligible driver with its distance to the pickup.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub driver_id: UserId,
    pub distance_km: f64,
}

/// The driver bound by a successful dispatch (snapshot taken after binding).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverMatch {
    pub driver: Driver,
    pub distance_km: f64,
}

/// Result of a dispatch attempt. An empty pool is an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched(DriverMatch),
    NoDriverAvailable,
}

impl MatchOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }

    pub fn driver(&self) -> Option<&Driver> {
        match self {
            MatchOutcome::Matched(found) => Some(&found.driver),
            MatchOutcome::NoDriverAvailable => None,
        }
    }
}
