//! `rand`-backed [`RandomSource`]

use hq_domain::RandomSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct RandRandomSource {
    rng: StdRng,
}

impl RandRandomSource {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence, for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for RandRandomSource {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}
