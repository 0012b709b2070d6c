use std::cmp::Ordering;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::types::Candidate;

/// Trait for driver selection policies.
///
/// Dispatch filters the pool first (online, available, inside the radius, not
/// declined) and hands the survivors to the algorithm, sorted by driver id.
/// The algorithm only picks; binding the driver is the pool's job.
pub trait MatchingAlgorithm: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Index into `candidates` of the chosen driver, or `None` to decline all.
    fn select(&self, candidates: &[Candidate]) -> Option<usize>;
}

/// Nearest driver wins; equal distances go to the lowest driver id.
#[derive(Debug, Default)]
pub struct NearestFirst;

impl MatchingAlgorithm for NearestFirst {
    fn name(&self) -> &'static str {
        "nearest_first"
    }

    fn select(&self, candidates: &[Candidate]) -> Option<usize> {
        candidates
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.distance_km
                    .partial_cmp(&b.distance_km)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.driver_id.cmp(&b.driver_id))
            })
            .map(|(idx, _)| idx)
    }
}

/// Uniform pick among eligible drivers, reproducible for a given seed.
///
/// Mimics the "any nearby driver" feel of a demo without giving up
/// determinism in tests.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl MatchingAlgorithm for SeededRandom {
    fn name(&self) -> &'static str {
        "seeded_random"
    }

    fn select(&self, candidates: &[Candidate]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Some(rng.gen_range(0..candidates.len()))
    }
}

/// Which matching algorithm the desk uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingKind {
    #[default]
    NearestFirst,
    SeededRandom,
}

impl MatchingKind {
    pub fn build(self, seed: u64) -> Box<dyn MatchingAlgorithm> {
        match self {
            MatchingKind::NearestFirst => Box::new(NearestFirst),
            MatchingKind::SeededRandom => Box::new(SeededRandom::new(seed)),
        }
    }
}
