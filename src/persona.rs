//! Member persona metrics.
//!
//! No real scoring model exists yet. [`PlaceholderScorer`] emits illustrative
//! values that ignore member data entirely; swap in another [`PersonaScorer`]
//! once one does.

use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::PersonaMetric;

/// Metric names, in display order.
pub const PERSONA_DIMENSIONS: [&str; 5] = [
    "Adherence",
    "Engagement",
    "Progress",
    "Complexity",
    "Satisfaction",
];

pub const SCORE_MAX: u8 = 100;

const PLACEHOLDER_RANGE: RangeInclusive<u8> = 60..=95;

impl PersonaMetric {
    /// Clamps `value` into `0..=SCORE_MAX`.
    pub fn new(name: &'static str, value: u8) -> Self {
        Self {
            name,
            value: value.min(SCORE_MAX),
        }
    }
}

pub trait PersonaScorer {
    /// One metric per entry of [`PERSONA_DIMENSIONS`], in the same order.
    fn score(&self) -> Vec<PersonaMetric>;
}

#[derive(Debug, Clone, Copy)]
pub struct PlaceholderScorer {
    seed: u64,
}

impl PlaceholderScorer {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl PersonaScorer for PlaceholderScorer {
    fn score(&self) -> Vec<PersonaMetric> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        PERSONA_DIMENSIONS
            .iter()
            .map(|&name| PersonaMetric::new(name, rng.random_range(PLACEHOLDER_RANGE)))
            .collect()
    }
}
