pub mod clock;
pub mod config;
pub mod countdown;
pub mod desk;
pub mod ecs;
pub mod error;
pub mod fixtures;
pub mod geo;
pub mod history;
pub mod lifecycle;
pub mod matching;
pub mod model;
pub mod pricing;
pub mod routing;
pub mod runner;
pub mod simulation;
pub mod spatial;
pub mod systems;
pub mod telemetry;
pub mod wallet;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use config::{ConfigError, DeskConfig};
pub use desk::RideDesk;
pub use error::{RideError, RideResult};
pub use simulation::Simulation;
