//! Route estimation seam.
//!
//! Real routing and geocoding live outside this crate. The desk only needs a
//! distance and a duration for a pickup/destination pair, supplied through
//! [`RouteEstimator`]:
//!
//! - **`StraightLineEstimator`**: haversine distance scaled by a detour factor,
//!   at a fixed average city speed. The default.
//! - **`FixedRouteEstimator`**: returns one canned estimate; useful for demos
//!   and tests that pin the trip distance.

use serde::{Deserialize, Serialize};

use crate::geo::{haversine_km, Location};

/// Average city speed used when nothing better is known (km/h).
pub const DEFAULT_SPEED_KMH: f64 = 30.0;

/// Road distance is longer than the great-circle distance by roughly this factor.
pub const DEFAULT_DETOUR_FACTOR: f64 = 1.3;

/// Distance and duration for one trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub duration_minutes: u32,
}

impl RouteEstimate {
    pub fn new(distance_km: f64, duration_minutes: u32) -> Self {
        Self {
            distance_km,
            duration_minutes,
        }
    }
}

/// Trait for routing backends. Implementations must be `Send + Sync` so the
/// estimator can live inside the shared desk resource.
pub trait RouteEstimator: Send + Sync {
    fn estimate(&self, from: &Location, to: &Location) -> RouteEstimate;
}

#[derive(Debug, Clone, Copy)]
pub struct StraightLineEstimator {
    pub detour_factor: f64,
    pub speed_kmh: f64,
}

impl Default for StraightLineEstimator {
    fn default() -> Self {
        Self {
            detour_factor: DEFAULT_DETOUR_FACTOR,
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl RouteEstimator for StraightLineEstimator {
    fn estimate(&self, from: &Location, to: &Location) -> RouteEstimate {
        let distance_km = haversine_km(from, to) * self.detour_factor;
        RouteEstimate {
            distance_km,
            duration_minutes: travel_minutes(distance_km, self.speed_kmh),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedRouteEstimator(pub RouteEstimate);

impl RouteEstimator for FixedRouteEstimator {
    fn estimate(&self, _from: &Location, _to: &Location) -> RouteEstimate {
        self.0
    }
}

/// Whole minutes to cover `distance_km` at `speed_kmh`, rounded up.
pub fn travel_minutes(distance_km: f64, speed_kmh: f64) -> u32 {
    if distance_km <= 0.0 || speed_kmh <= 0.0 || !distance_km.is_finite() {
        return 0;
    }
    let minutes = (distance_km * 60.0 / speed_kmh).ceil();
    if minutes >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        minutes as u32
    }
}

/// Length of the arrival countdown for a driver heading to `pickup`.
///
/// Never zero: even a driver parked at the pickup needs a minute.
pub fn pickup_eta_minutes(driver: &Location, pickup: &Location, speed_kmh: f64) -> u32 {
    travel_minutes(haversine_km(driver, pickup) * DEFAULT_DETOUR_FACTOR, speed_kmh).max(1)
}
