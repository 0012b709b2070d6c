//! Fare calculation per ride class.
//!
//! Formula: `fare = max(base + distance_km * per_km, minimum)`, rounded to cents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RideError, RideResult};

/// Service tier; affects fare schedule and vehicle size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideClass {
    Economy,
    Comfort,
    Xl,
}

impl RideClass {
    pub const ALL: [RideClass; 3] = [RideClass::Economy, RideClass::Comfort, RideClass::Xl];

    pub fn as_str(self) -> &'static str {
        match self {
            RideClass::Economy => "economy",
            RideClass::Comfort => "comfort",
            RideClass::Xl => "xl",
        }
    }

    pub fn seats(self) -> u8 {
        match self {
            RideClass::Economy | RideClass::Comfort => 4,
            RideClass::Xl => 6,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RideClass::Economy => "Affordable everyday rides",
            RideClass::Comfort => "Newer cars with extra legroom",
            RideClass::Xl => "SUVs and large cars",
        }
    }
}

impl fmt::Display for RideClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RideClass {
    type Err = RideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "economy" => Ok(RideClass::Economy),
            "comfort" => Ok(RideClass::Comfort),
            "xl" => Ok(RideClass::Xl),
            _ => Err(RideError::InvalidRideClass(s.to_string())),
        }
    }
}

/// Fare parameters for one ride class, in currency units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareSchedule {
    pub base: f64,
    pub per_km: f64,
    pub minimum: f64,
}

pub const ECONOMY_FARE: FareSchedule = FareSchedule {
    base: 2.50,
    per_km: 1.20,
    minimum: 5.00,
};

pub const COMFORT_FARE: FareSchedule = FareSchedule {
    base: 3.50,
    per_km: 1.80,
    minimum: 7.00,
};

pub const XL_FARE: FareSchedule = FareSchedule {
    base: 4.50,
    per_km: 2.20,
    minimum: 9.00,
};

impl FareSchedule {
    /// Fare for `distance_km`, never below the schedule's minimum.
    pub fn fare(&self, distance_km: f64) -> RideResult<f64> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(RideError::InvalidDistance(distance_km));
        }
        let raw = self.base + distance_km * self.per_km;
        Ok(round_to_cents(raw.max(self.minimum)))
    }
}

/// Fare schedules for every ride class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FareTable {
    pub economy: FareSchedule,
    pub comfort: FareSchedule,
    pub xl: FareSchedule,
}

impl Default for FareTable {
    fn default() -> Self {
        Self {
            economy: ECONOMY_FARE,
            comfort: COMFORT_FARE,
            xl: XL_FARE,
        }
    }
}

impl FareTable {
    pub fn schedule(&self, class: RideClass) -> &FareSchedule {
        match class {
            RideClass::Economy => &self.economy,
            RideClass::Comfort => &self.comfort,
            RideClass::Xl => &self.xl,
        }
    }

    pub fn fare(&self, distance_km: f64, class: RideClass) -> RideResult<f64> {
        self.schedule(class).fare(distance_km)
    }

    /// One quote per ride class, cheapest tier first.
    pub fn quote_all(&self, distance_km: f64) -> RideResult<Vec<FareQuote>> {
        RideClass::ALL
            .iter()
            .map(|&class| {
                Ok(FareQuote {
                    class,
                    price: self.fare(distance_km, class)?,
                    seats: class.seats(),
                    description: class.description(),
                })
            })
            .collect()
    }
}

/// Price shown for one ride class on the booking screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FareQuote {
    pub class: RideClass,
    pub price: f64,
    pub seats: u8,
    pub description: &'static str,
}

/// Fare with the default schedules.
pub fn compute_fare(distance_km: f64, class: RideClass) -> RideResult<f64> {
    FareTable::default().fare(distance_km, class)
}

/// Like [`compute_fare`], for a class given by name.
pub fn compute_fare_by_name(distance_km: f64, class: &str) -> RideResult<f64> {
    compute_fare(distance_km, class.parse()?)
}

/// Quotes for every class with the default schedules.
pub fn quote_all(distance_km: f64) -> RideResult<Vec<FareQuote>> {
    FareTable::default().quote_all(distance_km)
}

fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
