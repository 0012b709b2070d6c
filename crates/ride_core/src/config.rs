//! Desk configuration: dispatch radius, timer cadence, pricing, matching policy.
//!
//! Loaded from JSON; every field is optional and falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::ONE_SEC_MS;
use crate::matching::MatchingKind;
use crate::pricing::FareTable;
use crate::routing::DEFAULT_SPEED_KMH;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Drivers must be strictly closer than this to the pickup.
    pub max_radius_km: f64,
    /// Delay between a ride request and the first dispatch attempt.
    pub search_delay_secs: u64,
    /// Arrival countdown step; the ETA drops by one minute per tick.
    pub arrival_tick_secs: u64,
    /// Cadence of simulated driver position updates.
    pub position_update_secs: u64,
    /// Wait before retrying a dispatch that found no driver.
    pub dispatch_retry_secs: u64,
    /// Dispatch attempts before the system cancels the request.
    pub max_dispatch_attempts: u32,
    /// Complete trips automatically after their estimated duration.
    pub auto_complete: bool,
    /// Charge the rider's wallet when a trip completes.
    pub charge_on_completion: bool,
    /// Speed used for pickup ETAs and simulated movement (km/h).
    pub driver_speed_kmh: f64,
    pub matching: MatchingKind,
    /// Seed for randomised matching.
    pub seed: u64,
    pub fares: FareTable,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            max_radius_km: 5.0,
            search_delay_secs: 3,
            arrival_tick_secs: 60,
            position_update_secs: 8,
            dispatch_retry_secs: 10,
            max_dispatch_attempts: 3,
            auto_complete: true,
            charge_on_completion: true,
            driver_speed_kmh: DEFAULT_SPEED_KMH,
            matching: MatchingKind::default(),
            seed: 0,
            fares: FareTable::default(),
        }
    }
}

impl DeskConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: DeskConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn search_delay_ms(&self) -> u64 {
        self.search_delay_secs.saturating_mul(ONE_SEC_MS)
    }

    pub fn arrival_tick_ms(&self) -> u64 {
        self.arrival_tick_secs.saturating_mul(ONE_SEC_MS)
    }

    pub fn position_update_ms(&self) -> u64 {
        self.position_update_secs.saturating_mul(ONE_SEC_MS)
    }

    pub fn dispatch_retry_ms(&self) -> u64 {
        self.dispatch_retry_secs.saturating_mul(ONE_SEC_MS)
    }

    /// Distance a driver covers between two position updates.
    pub fn position_step_km(&self) -> f64 {
        self.driver_speed_kmh * self.position_update_secs as f64 / 3600.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_radius_km.is_finite() && self.max_radius_km > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_radius_km must be positive, got {}",
                self.max_radius_km
            )));
        }
        if self.arrival_tick_secs == 0 || self.position_update_secs == 0 {
            return Err(ConfigError::Invalid(
                "timer intervals must be at least one second".to_string(),
            ));
        }
        if self.max_dispatch_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_dispatch_attempts must be at least 1".to_string(),
            ));
        }
        if !(self.driver_speed_kmh.is_finite() && self.driver_speed_kmh > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "driver_speed_kmh must be positive, got {}",
                self.driver_speed_kmh
            )));
        }
        for (name, schedule) in [
            ("economy", &self.fares.economy),
            ("comfort", &self.fares.comfort),
            ("xl", &self.fares.xl),
        ] {
            let values = [schedule.base, schedule.per_km, schedule.minimum];
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) || schedule.minimum <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "fare schedule for {name} must be non-negative with a positive minimum"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_yields_defaults() {
        let config = DeskConfig::from_json_str("{}").unwrap();
        assert_eq!(config, DeskConfig::default());
        assert_eq!(config.arrival_tick_secs, 60);
        assert_eq!(config.position_update_secs, 8);
        assert_eq!(config.search_delay_ms(), 3_000);
        assert_eq!(config.arrival_tick_ms(), 60_000);
        assert!((config.position_step_km() - 30.0 * 8.0 / 3600.0).abs() < 1e-12);
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let config = DeskConfig::from_json_str(
            r#"{
                "max_radius_km": 3.5,
                "matching": "seeded_random",
                "fares": { "xl": { "base": 5.0, "per_km": 2.5, "minimum": 10.0 } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_radius_km, 3.5);
        assert_eq!(config.matching, MatchingKind::SeededRandom);
        assert_eq!(config.fares.xl.minimum, 10.0);
        assert_eq!(config.fares.economy, crate::pricing::ECONOMY_FARE);
        assert!(config.auto_complete);
        assert!(config.charge_on_completion);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            DeskConfig::from_json_str(r#"{ "max_radius_km": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            DeskConfig::from_json_str(r#"{ "arrival_tick_secs": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            DeskConfig::from_json_str(r#"{ "matching": "telepathy" }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "seed": 42, "auto_complete": false }}"#).unwrap();
        let config = DeskConfig::from_path(file.path()).unwrap();
        assert_eq!(config.seed, 42);
        assert!(!config.auto_complete);

        assert!(matches!(
            DeskConfig::from_path("/definitely/not/here.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
