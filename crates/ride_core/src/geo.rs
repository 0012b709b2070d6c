//! Geographic primitives: coordinates, places, and great-circle distance.

use h3o::{CellIndex, LatLng, Resolution};
use serde::{Deserialize, Serialize};

use crate::error::{RideError, RideResult};

/// Mean Earth radius used for haversine distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    /// Validated constructor: latitude in -90..=90, longitude in -180..=180.
    pub fn new(lat: f64, lng: f64) -> RideResult<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        if !valid {
            return Err(RideError::InvalidCoordinates { lat, lng });
        }
        Ok(Self { lat, lng })
    }

    /// Great-circle distance to `other` in kilometres.
    pub fn distance_km(&self, other: &Location) -> f64 {
        haversine_km(self, other)
    }

    /// Point `fraction` of the way toward `target` (clamped to 0..=1).
    ///
    /// Linear in lat/lng, which is accurate enough over city distances.
    pub fn toward(&self, target: &Location, fraction: f64) -> Location {
        let t = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        Location {
            lat: self.lat + (target.lat - self.lat) * t,
            lng: self.lng + (target.lng - self.lng) * t,
        }
    }

    /// H3 cell containing this point.
    pub fn cell(&self, resolution: Resolution) -> RideResult<CellIndex> {
        LatLng::new(self.lat, self.lng)
            .map(|ll| ll.to_cell(resolution))
            .map_err(|_| RideError::InvalidCoordinates {
                lat: self.lat,
                lng: self.lng,
            })
    }
}

/// Haversine distance between two points, in kilometres.
pub fn haversine_km(a: &Location, b: &Location) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// A named address with coordinates (pickup or destination).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub address: String,
    pub location: Location,
}

impl Place {
    pub fn new(address: impl Into<String>, location: Location) -> Self {
        Self {
            address: address.into(),
            location,
        }
    }
}
