//! Dispatch matching: eligibility filter, selection policies, and the shared driver pool.

pub mod algorithm;
pub mod dispatch;
pub mod pool;
pub mod types;

pub use algorithm::{MatchingAlgorithm, MatchingKind, NearestFirst, SeededRandom};
pub use dispatch::{eligible_distance, find_driver, find_driver_with};
pub use pool::DriverPool;
pub use types::{Candidate, DriverMatch, MatchOutcome};
