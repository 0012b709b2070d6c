//! Ride request lifecycle: `pending → accepted → in_progress → completed`,
//! with cancellation from any non-terminal status.
//!
//! Transitions are all-or-nothing. [`RideRequest::apply`] checks the event
//! against the current status before touching any field, and [`transition`]
//! leaves its input untouched.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RideError, RideResult};
use crate::geo::Place;
use crate::model::{RideId, UserId};
use crate::pricing::{FareTable, RideClass};
use crate::routing::RouteEstimate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    /// Waiting for a driver.
    Pending,
    /// Driver assigned and heading to pickup.
    Accepted,
    /// Rider on board.
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    /// `completed` and `cancelled` accept no further events.
    pub fn is_terminal(self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// A driver is bound to the ride.
    pub fn is_active(self) -> bool {
        matches!(self, RideStatus::Accepted | RideStatus::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Accepted => "accepted",
            RideStatus::InProgress => "in_progress",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who cancelled a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Rider,
    Driver,
    /// Dispatch gave up or the operator intervened.
    System,
}

/// Inputs to the lifecycle state machine. Timestamps are milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RideEvent {
    Accept { driver_id: UserId, at: u64 },
    /// The driver passes on a pending request; it stays in the matching pool.
    Decline { driver_id: UserId },
    /// Arrival countdown reached zero.
    DriverArrived { at: u64 },
    Complete { at: u64 },
    Cancel { by: CancelledBy, at: u64 },
}

impl RideEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RideEvent::Accept { .. } => "accept",
            RideEvent::Decline { .. } => "decline",
            RideEvent::DriverArrived { .. } => "start",
            RideEvent::Complete { .. } => "complete",
            RideEvent::Cancel { .. } => "cancel",
        }
    }
}

/// Star rating given after a completed ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(stars: u8) -> RideResult<Self> {
        if (Self::MIN..=Self::MAX).contains(&stars) {
            Ok(Self(stars))
        } else {
            Err(RideError::InvalidRating(stars))
        }
    }

    pub fn stars(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = RideError;

    fn try_from(stars: u8) -> Result<Self, Self::Error> {
        Rating::new(stars)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// The central ride record.
///
/// Fields are read through accessors; status, driver, and timestamps change
/// only through [`RideRequest::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRequest {
    id: RideId,
    rider_id: UserId,
    driver_id: Option<UserId>,
    pickup: Place,
    destination: Place,
    ride_class: RideClass,
    price: f64,
    status: RideStatus,
    requested_at: u64,
    accepted_at: Option<u64>,
    started_at: Option<u64>,
    completed_at: Option<u64>,
    cancelled_at: Option<u64>,
    cancelled_by: Option<CancelledBy>,
    distance_km: f64,
    estimated_duration_minutes: u32,
    declined_by: Vec<UserId>,
    rating: Option<Rating>,
    feedback: Option<String>,
}

impl RideRequest {
    /// Creates a `pending` request priced from `fares` at creation time.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: RideId,
        rider_id: UserId,
        pickup: Place,
        destination: Place,
        ride_class: RideClass,
        route: RouteEstimate,
        fares: &FareTable,
        requested_at: u64,
    ) -> RideResult<Self> {
        let price = fares.fare(route.distance_km, ride_class)?;
        Ok(Self {
            id,
            rider_id,
            driver_id: None,
            pickup,
            destination,
            ride_class,
            price,
            status: RideStatus::Pending,
            requested_at,
            accepted_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            cancelled_by: None,
            distance_km: route.distance_km,
            estimated_duration_minutes: route.duration_minutes,
            declined_by: Vec::new(),
            rating: None,
            feedback: None,
        })
    }

    pub fn id(&self) -> &RideId {
        &self.id
    }

    pub fn rider_id(&self) -> &UserId {
        &self.rider_id
    }

    pub fn driver_id(&self) -> Option<&UserId> {
        self.driver_id.as_ref()
    }

    pub fn pickup(&self) -> &Place {
        &self.pickup
    }

    pub fn destination(&self) -> &Place {
        &self.destination
    }

    pub fn ride_class(&self) -> RideClass {
        self.ride_class
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn status(&self) -> RideStatus {
        self.status
    }

    pub fn requested_at(&self) -> u64 {
        self.requested_at
    }

    pub fn accepted_at(&self) -> Option<u64> {
        self.accepted_at
    }

    /// When the driver reached pickup.
    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<u64> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<u64> {
        self.cancelled_at
    }

    pub fn cancelled_by(&self) -> Option<CancelledBy> {
        self.cancelled_by
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub fn estimated_duration_minutes(&self) -> u32 {
        self.estimated_duration_minutes
    }

    /// Drivers that passed on this request while it was pending.
    pub fn declined_by(&self) -> &[UserId] {
        &self.declined_by
    }

    pub fn rating(&self) -> Option<Rating> {
        self.rating
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Applies `event` in place. On error the ride is unchanged.
    pub fn apply(&mut self, event: RideEvent) -> RideResult<()> {
        let from = self.status;
        match (from, event) {
            (RideStatus::Pending, RideEvent::Accept { driver_id, at }) => {
                self.status = RideStatus::Accepted;
                self.driver_id = Some(driver_id);
                self.accepted_at = Some(at);
            }
            (RideStatus::Pending, RideEvent::Decline { driver_id }) => {
                if !self.declined_by.contains(&driver_id) {
                    self.declined_by.push(driver_id);
                }
            }
            (RideStatus::Accepted, RideEvent::DriverArrived { at }) => {
                self.status = RideStatus::InProgress;
                self.started_at = Some(at);
            }
            (RideStatus::InProgress, RideEvent::Complete { at }) => {
                self.status = RideStatus::Completed;
                self.completed_at = Some(at);
            }
            (status, RideEvent::Cancel { by, at }) if !status.is_terminal() => {
                self.status = RideStatus::Cancelled;
                self.cancelled_at = Some(at);
                self.cancelled_by = Some(by);
            }
            (status, event) => {
                return Err(RideError::invalid_transition(&self.id, status, event.name()));
            }
        }
        Ok(())
    }

    /// Attaches the one-time rating and feedback to a completed ride.
    ///
    /// Blank feedback is dropped.
    pub fn rate(&mut self, rating: Option<Rating>, feedback: Option<String>) -> RideResult<()> {
        if self.status != RideStatus::Completed {
            return Err(RideError::NotCompleted {
                ride_id: self.id.clone(),
                status: self.status,
            });
        }
        if self.rating.is_some() || self.feedback.is_some() {
            return Err(RideError::RatingAlreadyRecorded(self.id.clone()));
        }
        self.rating = rating;
        self.feedback = feedback
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        Ok(())
    }
}

/// Pure transition: returns the next ride state, leaving `ride` untouched.
pub fn transition(ride: &RideRequest, event: RideEvent) -> RideResult<RideRequest> {
    let mut next = ride.clone();
    next.apply(event)?;
    Ok(next)
}
