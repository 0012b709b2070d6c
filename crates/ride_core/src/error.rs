//! Ride desk error types.

use thiserror::Error;

use crate::lifecycle::RideStatus;
use crate::model::{RideId, UserId};

/// Errors raised by fare, dispatch, lifecycle and history operations.
///
/// Every variant is local and recoverable; the caller decides whether to retry
/// or surface it. "No driver available" is not here: it is a normal
/// [`MatchOutcome`](crate::matching::MatchOutcome).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RideError {
    /// Ride class name not recognised.
    #[error("invalid ride class: {0}")]
    InvalidRideClass(String),

    /// Trip distance is negative or not a finite number.
    #[error("invalid trip distance: {0} km")]
    InvalidDistance(f64),

    /// Latitude/longitude outside the valid range.
    #[error("invalid coordinates: lat {lat}, lng {lng}")]
    InvalidCoordinates { lat: f64, lng: f64 },

    /// Event not allowed from the ride's current status.
    #[error("invalid transition for ride {ride_id}: cannot {event} from {from}")]
    InvalidTransition {
        ride_id: RideId,
        from: RideStatus,
        event: &'static str,
    },

    /// Rating or archival requested on a ride that has not completed.
    #[error("ride {ride_id} is not completed (status: {status})")]
    NotCompleted { ride_id: RideId, status: RideStatus },

    /// Rating outside 1..=5.
    #[error("invalid rating: {0} (expected 1-5)")]
    InvalidRating(u8),

    /// A completed ride can be rated once.
    #[error("ride {0} already has a rating")]
    RatingAlreadyRecorded(RideId),

    #[error("ride not found: {0}")]
    UnknownRide(RideId),

    #[error("driver not found: {0}")]
    UnknownDriver(UserId),

    /// Driver is offline, already bound, or has no location.
    #[error("driver {0} is not available")]
    DriverUnavailable(UserId),

    /// Driver declined the ride or is outside the dispatch radius.
    #[error("driver {driver_id} may not take ride {ride_id}")]
    DriverNotEligible { driver_id: UserId, ride_id: RideId },

    /// Driver cannot go offline while bound to a ride.
    #[error("driver {driver_id} is bound to ride {ride_id}")]
    DriverBusy { driver_id: UserId, ride_id: RideId },

    /// Rider already has an open ride.
    #[error("rider {rider_id} already has open ride {ride_id}")]
    RiderBusy { rider_id: UserId, ride_id: RideId },

    /// User record has the wrong role for the requested operation.
    #[error("user {0} does not have the required role")]
    RoleMismatch(UserId),

    /// Top-up that is zero, negative or not a number.
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("invalid card number")]
    InvalidCardNumber,

    #[error("payment method already saved: {0}")]
    DuplicatePaymentMethod(String),

    #[error("payment method not found: {0}")]
    UnknownPaymentMethod(String),

    /// Balance does not cover the fare and no card is saved.
    #[error("insufficient funds for {user_id}: balance {balance:.2}, fare {amount:.2}")]
    InsufficientFunds {
        user_id: UserId,
        balance: f64,
        amount: f64,
    },

    #[error("ride {0} was already charged")]
    AlreadyCharged(RideId),
}

impl RideError {
    /// Creates an invalid transition error.
    pub fn invalid_transition(ride_id: &RideId, from: RideStatus, event: &'static str) -> Self {
        Self::InvalidTransition {
            ride_id: ride_id.clone(),
            from,
            event,
        }
    }
}

/// Result type for ride desk operations.
pub type RideResult<T> = Result<T, RideError>;
