//! Error types for Moment Insights

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse moment payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response category: {0}")]
    InvalidResponseCategory(String),

    #[error("Invalid window bounds: {0}")]
    InvalidWindow(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Unknown week window: {0}")]
    UnknownWindow(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Invalid moment: {0}")]
    InvalidMoment(#[from] ValidationError),
}

/// Field-level validation errors for logged moments and check-ins
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Moment id must not be empty")]
    EmptyId,

    #[error("Moment {id} has an empty description")]
    EmptyDescription { id: String },

    #[error("Moment {id} has an empty custom location")]
    EmptyCustomLocation { id: String },

    #[error("Check-in {id} rates {domain} at {rating}, outside 0-{max}")]
    RatingOutOfRange {
        id: String,
        domain: String,
        rating: u8,
        max: u8,
    },
}
