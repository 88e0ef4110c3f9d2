//! Summary wording
//!
//! All user-facing sentences are neutral observations. Nothing here frames a
//! response as success or failure, and nothing uses diagnostic language.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::DominantPattern;

/// Rotation used for the sparse tier
pub const SPARSE_SUMMARIES: [&str; 2] = [
    "You're beginning to observe your responses.",
    "Every entry builds awareness.",
];

/// Secondary line for the full tier
pub const FULL_SECONDARY_TEXT: &str = "Awareness patterns can shift week to week.";

/// Canonical full-tier sentence for a pattern
pub fn full_summary(pattern: DominantPattern) -> Option<&'static str> {
    match pattern {
        DominantPattern::ActedDominant => {
            Some("Your responses were mostly immediate reactions this week.")
        }
        DominantPattern::PausedDominant => {
            Some("You created pauses before responding more often this week.")
        }
        DominantPattern::NoticedDominant => {
            Some("You noticed urges without acting more often this week.")
        }
        DominantPattern::Mixed => Some("You showed a mix of responses this week."),
        DominantPattern::InsufficientData => None,
    }
}

/// Chooses an index into a phrase rotation.
///
/// Injected into the classifier so tests can pin the sparse-tier wording.
pub trait PhrasePicker {
    /// Return an index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// Picks uniformly at random
pub struct RandomPicker {
    rng: StdRng,
}

impl RandomPicker {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhrasePicker for RandomPicker {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Always picks the same slot (wrapped into range)
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPicker(pub usize);

impl PhrasePicker for FixedPicker {
    fn pick(&mut self, len: usize) -> usize {
        self.0 % len
    }
}

/// Pick one sparse-tier sentence
pub fn sparse_summary(picker: &mut dyn PhrasePicker) -> &'static str {
    SPARSE_SUMMARIES[picker.pick(SPARSE_SUMMARIES.len())]
}
