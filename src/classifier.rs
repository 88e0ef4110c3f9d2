//! Weekly insight classification
//!
//! Turns the moments of one window into a tiered insight:
//!
//! - `0` moments: empty tier, no summary
//! - `1..=sparse_threshold`: sparse tier, encouragement wording, no comparisons
//! - more: full tier, strict-majority dominant pattern, canonical sentence
//!
//! The input is trusted to be filtered to one owner and one window already.

use crate::config::InsightConfig;
use crate::phrasing::{self, PhrasePicker, RandomPicker};
use crate::types::{DominantPattern, Insight, InsightTier, ResponseCounts, ResponseEvent};

/// Data-sufficiency tier for a moment count
pub fn tier_for(total: u32, config: &InsightConfig) -> InsightTier {
    if total == 0 {
        InsightTier::Empty
    } else if total <= config.sparse_threshold {
        InsightTier::Sparse
    } else {
        InsightTier::Full
    }
}

/// Strict-majority pattern. Any tie at the top is `Mixed`.
pub fn dominant_pattern(counts: &ResponseCounts) -> DominantPattern {
    let ResponseCounts {
        acted,
        paused,
        noticed,
    } = *counts;

    if counts.total() == 0 {
        DominantPattern::InsufficientData
    } else if acted > paused && acted > noticed {
        DominantPattern::ActedDominant
    } else if paused > acted && paused > noticed {
        DominantPattern::PausedDominant
    } else if noticed > acted && noticed > paused {
        DominantPattern::NoticedDominant
    } else {
        DominantPattern::Mixed
    }
}

/// Classifies a window's moments into an [`Insight`]
pub struct InsightClassifier<P: PhrasePicker = RandomPicker> {
    config: InsightConfig,
    picker: P,
}

impl Default for InsightClassifier<RandomPicker> {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightClassifier<RandomPicker> {
    /// Default thresholds, random sparse wording
    pub fn new() -> Self {
        Self::with_picker(InsightConfig::default(), RandomPicker::new())
    }

    /// Default thresholds, reproducible sparse wording
    pub fn seeded(seed: u64) -> Self {
        Self::with_picker(InsightConfig::default(), RandomPicker::seeded(seed))
    }
}

impl<P: PhrasePicker> InsightClassifier<P> {
    pub fn with_picker(config: InsightConfig, picker: P) -> Self {
        Self { config, picker }
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    /// Classify a window's moments
    pub fn classify(&mut self, events: &[ResponseEvent]) -> Insight {
        self.classify_counts(ResponseCounts::tally(events))
    }

    /// Classify from already-tallied counts
    pub fn classify_counts(&mut self, counts: ResponseCounts) -> Insight {
        let total = counts.total();
        let tier = tier_for(total, &self.config);
        let pattern = dominant_pattern(&counts);

        let insight = match tier {
            InsightTier::Empty => Insight {
                tier,
                dominant_pattern: DominantPattern::InsufficientData,
                summary_text: None,
                secondary_text: None,
                counts,
                all_events_acted: false,
                entries_until_full_analysis: None,
            },
            InsightTier::Sparse => Insight {
                tier,
                dominant_pattern: pattern,
                summary_text: Some(phrasing::sparse_summary(&mut self.picker).to_string()),
                secondary_text: None,
                counts,
                all_events_acted: counts.acted == total,
                entries_until_full_analysis: Some(
                    self.config.full_analysis_minimum().saturating_sub(total),
                ),
            },
            InsightTier::Full => Insight {
                tier,
                dominant_pattern: pattern,
                summary_text: phrasing::full_summary(pattern).map(str::to_string),
                secondary_text: Some(phrasing::FULL_SECONDARY_TEXT.to_string()),
                counts,
                all_events_acted: counts.acted == total,
                entries_until_full_analysis: None,
            },
        };

        tracing::debug!(
            total,
            tier = ?insight.tier,
            pattern = ?insight.dominant_pattern,
            "Classified window"
        );

        insight
    }
}
