//! Tunable insight thresholds
//!
//! Thresholds live here rather than inside the classification logic so they
//! can be tuned (or loaded from a TOML file) without touching it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

/// Highest moment count that is still reported as the sparse tier
pub const DEFAULT_SPARSE_THRESHOLD: u32 = 3;

/// Number of latest entries considered when suggesting previous urges
pub const DEFAULT_RECENT_URGE_LIMIT: usize = 5;

/// Highest rating a check-in domain accepts
pub const MAX_INTERFERENCE_RATING: u8 = 10;

/// Domain averages at or above this count as high interference
pub const DEFAULT_HIGH_INTERFERENCE: u8 = 7;

/// Domain averages at or below this count as low interference
pub const DEFAULT_LOW_INTERFERENCE: u8 = 4;

/// Configuration for insight classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// `1..=sparse_threshold` moments produce a sparse insight
    pub sparse_threshold: u32,

    /// Entries inspected for previous-urge suggestions
    pub recent_urge_limit: usize,

    /// Weekly domain average treated as high interference
    pub high_interference_threshold: u8,

    /// Weekly domain average treated as low interference
    pub low_interference_threshold: u8,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            sparse_threshold: DEFAULT_SPARSE_THRESHOLD,
            recent_urge_limit: DEFAULT_RECENT_URGE_LIMIT,
            high_interference_threshold: DEFAULT_HIGH_INTERFERENCE,
            low_interference_threshold: DEFAULT_LOW_INTERFERENCE,
        }
    }
}

impl InsightConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ComputeError> {
        let config: InsightConfig =
            toml::from_str(s).map_err(|e| ComputeError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file on disk
    pub fn from_file(path: &Path) -> Result<Self, ComputeError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ComputeError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.sparse_threshold == 0 {
            return Err(ComputeError::ConfigError(
                "sparse_threshold must be at least 1".to_string(),
            ));
        }
        if self.recent_urge_limit == 0 {
            return Err(ComputeError::ConfigError(
                "recent_urge_limit must be at least 1".to_string(),
            ));
        }
        if self.high_interference_threshold > MAX_INTERFERENCE_RATING {
            return Err(ComputeError::ConfigError(format!(
                "high_interference_threshold must be at most {}",
                MAX_INTERFERENCE_RATING
            )));
        }
        if self.low_interference_threshold >= self.high_interference_threshold {
            return Err(ComputeError::ConfigError(
                "low_interference_threshold must be below high_interference_threshold"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Smallest moment count that gets full pattern analysis
    pub fn full_analysis_minimum(&self) -> u32 {
        self.sparse_threshold.saturating_add(1)
    }
}
