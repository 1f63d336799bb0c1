use std::ops::Range;
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::domain::{CreditApplication, CreditDecision};

/// Starting point before the income-to-loan adjustment.
pub const BASE_SCORE: i64 = 600;
/// Half-open band the random perturbation is drawn from.
pub const NOISE_RANGE: Range<i32> = -50..50;

/// Supplies the bounded perturbation added to every score.
pub trait NoiseSource: Send + Sync {
    fn draw(&self) -> i32;
}

/// Process-lifetime generator, seeded once and shared across requests.
pub struct SeededNoise {
    rng: Mutex<StdRng>,
}

impl SeededNoise {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl NoiseSource for SeededNoise {
    fn draw(&self) -> i32 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_range(NOISE_RANGE)
    }
}

impl std::fmt::Debug for SeededNoise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededNoise").finish_non_exhaustive()
    }
}

/// Heuristic scorer: income-to-loan ratio plus a bounded random term.
pub struct ScoringEngine {
    noise: Box<dyn NoiseSource>,
}

impl ScoringEngine {
    pub fn new(noise: Box<dyn NoiseSource>) -> Self {
        Self { noise }
    }

    /// Engine seeded from `seed` when given, otherwise from OS entropy.
    pub fn seeded(seed: Option<u64>) -> Self {
        let noise = match seed {
            Some(seed) => SeededNoise::from_seed(seed),
            None => SeededNoise::from_entropy(),
        };
        Self::new(Box::new(noise))
    }

    pub fn score(&self, application: &CreditApplication) -> CreditDecision {
        let noise = self.noise.draw();
        let decision = Self::score_with_noise(application, noise);
        debug!(
            user_id = %decision.user_id,
            noise,
            score = decision.score,
            approved = decision.approved,
            "scored credit application"
        );
        decision
    }

    /// Score before noise. A non-positive amount contributes no ratio term.
    pub fn base_score(application: &CreditApplication) -> i64 {
        if application.income > 0.0 && application.amount > 0.0 {
            let ratio = application.income / application.amount;
            BASE_SCORE.saturating_add((ratio * 100.0).floor() as i64)
        } else {
            BASE_SCORE
        }
    }

    pub fn score_with_noise(application: &CreditApplication, noise: i32) -> CreditDecision {
        let raw = Self::base_score(application).saturating_add(i64::from(noise));
        CreditDecision::from_score(application.user_id.clone(), raw)
    }
}

impl std::fmt::Debug for ScoringEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringEngine").finish_non_exhaustive()
    }
}
