//! Moment Insights - weekly response-pattern insights for logged moments
//!
//! A moment is a timestamped record of how someone responded to an urge:
//! they acted on it, paused before responding, or noticed it without acting.
//! This crate turns the moments of a trailing week into a tiered insight
//! through a deterministic pipeline: window selection → fetch → tally →
//! tier/pattern classification → payload encoding.
//!
//! ## Modules
//!
//! - **Windows**: rolling 7-day windows relative to an instant
//! - **Classifier**: data-sufficiency tiers, dominant pattern and wording
//! - **Store**: the [`EventSource`] seam plus an in-memory owner-scoped store
//! - **Interference**: daily 0-10 check-ins summarized per Monday-start week

pub mod adapter;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod interference;
pub mod phrasing;
pub mod pipeline;
pub mod store;
pub mod types;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use classifier::InsightClassifier;
pub use config::InsightConfig;
pub use error::{ComputeError, ValidationError};
pub use interference::{InterferenceCheckin, InterferenceSummary, WeeklyInterference};
pub use pipeline::{
    all_weekly_insights, checkins_to_interference_json, events_to_insight_json, weekly_insight,
    weekly_interference, InsightProcessor,
};
pub use store::{CheckinSource, EventSource, MemoryEventStore};
pub use types::{
    DominantPattern, Insight, InsightTier, Location, ResponseCategory, ResponseEvent, WeekWindow,
    WindowInsight, WindowKey,
};
pub use window::WeekWindowCalculator;

/// Library version embedded in all insight payloads
pub const INSIGHTS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for insight payloads
pub const PRODUCER_NAME: &str = "moment-insights";
