//! Ride history: archived rides per participant, in insertion order.
//!
//! Once a ride reaches a terminal status it moves here and is read-only. Each
//! archived ride appears in its rider's log and, when a driver was assigned,
//! in that driver's log.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{RideError, RideResult};
use crate::lifecycle::{Rating, RideRequest, RideStatus};
use crate::model::{RideId, UserId};

#[derive(Debug, Default)]
pub struct RideHistory {
    by_participant: HashMap<UserId, Vec<RideRequest>>,
    total_archived: usize,
}

/// Trip totals for one participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    pub total_trips: usize,
    pub completed: usize,
    pub cancelled: usize,
    /// Sum of completed ride prices (spent for riders, earned for drivers).
    pub total_fare: f64,
    /// Mean of the ratings given, if any ride was rated.
    pub average_rating: Option<f64>,
}

impl RideHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Archives a completed ride with its optional rating and feedback.
    ///
    /// Omitting the rating ("skip") is valid; the ride is stored unrated.
    pub fn record_completion(
        &mut self,
        mut ride: RideRequest,
        rating: Option<Rating>,
        feedback: Option<String>,
    ) -> RideResult<()> {
        if ride.status() != RideStatus::Completed {
            return Err(RideError::NotCompleted {
                ride_id: ride.id().clone(),
                status: ride.status(),
            });
        }
        if rating.is_some() || feedback.is_some() {
            ride.rate(rating, feedback)?;
        }
        self.archive(ride);
        Ok(())
    }

    /// Archives a cancelled ride.
    pub fn record_cancellation(&mut self, ride: RideRequest) -> RideResult<()> {
        if ride.status() != RideStatus::Cancelled {
            return Err(RideError::invalid_transition(
                ride.id(),
                ride.status(),
                "archive",
            ));
        }
        self.archive(ride);
        Ok(())
    }

    fn archive(&mut self, ride: RideRequest) {
        if let Some(driver_id) = ride.driver_id() {
            if driver_id != ride.rider_id() {
                self.by_participant
                    .entry(driver_id.clone())
                    .or_default()
                    .push(ride.clone());
            }
        }
        self.by_participant
            .entry(ride.rider_id().clone())
            .or_default()
            .push(ride);
        self.total_archived += 1;
    }

    /// Archived rides for a rider or driver, oldest first.
    pub fn entries_for(&self, user_id: &UserId) -> &[RideRequest] {
        self.by_participant
            .get(user_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Looks up an archived ride by id.
    pub fn find(&self, ride_id: &RideId) -> Option<&RideRequest> {
        self.by_participant
            .values()
            .flat_map(|entries| entries.iter())
            .find(|ride| ride.id() == ride_id)
    }

    /// Number of rides archived overall.
    pub fn len(&self) -> usize {
        self.total_archived
    }

    pub fn is_empty(&self) -> bool {
        self.total_archived == 0
    }

    pub fn summary_for(&self, user_id: &UserId) -> HistorySummary {
        let entries = self.entries_for(user_id);
        let completed: Vec<&RideRequest> = entries
            .iter()
            .filter(|r| r.status() == RideStatus::Completed)
            .collect();
        let ratings: Vec<f64> = completed
            .iter()
            .filter_map(|r| r.rating())
            .map(|r| f64::from(r.stars()))
            .collect();
        let average_rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
        };
        HistorySummary {
            total_trips: entries.len(),
            completed: completed.len(),
            cancelled: entries
                .iter()
                .filter(|r| r.status() == RideStatus::Cancelled)
                .count(),
            total_fare: round_cents(completed.iter().map(|r| r.price()).sum()),
            average_rating,
        }
    }

    /// Fares from completed rides the driver drove.
    pub fn earnings_for(&self, driver_id: &UserId) -> f64 {
        let total = self
            .entries_for(driver_id)
            .iter()
            .filter(|r| r.status() == RideStatus::Completed && r.driver_id() == Some(driver_id))
            .map(RideRequest::price)
            .sum();
        round_cents(total)
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
