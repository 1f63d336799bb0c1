//! Credit application intake: validation, scoring, and the apply endpoint.

pub mod domain;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationError, CreditApplication, CreditDecision, APPROVAL_THRESHOLD, APPROVED_REASON,
    DECLINED_REASON, MAX_SCORE, MIN_SCORE,
};
pub use router::credit_router;
pub use scoring::{NoiseSource, ScoringEngine, SeededNoise, BASE_SCORE, NOISE_RANGE};
pub use service::CreditService;
