//! Insight payload encoder
//!
//! Wraps an [`Insight`] with producer metadata, the window it describes and
//! the display helpers a presentation layer needs.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ComputeError;
use crate::interference::InterferenceSummary;
use crate::types::{Insight, RankedResponse, ResponsePercentages, WeekWindow};
use crate::{INSIGHTS_VERSION, PRODUCER_NAME};

/// Current payload schema version
pub const PAYLOAD_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadProducer {
    pub name: String,
    pub version: String,
    /// Unique instance identifier (UUID)
    pub instance_id: String,
}

/// Encoded insight for one window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightPayload {
    pub payload_version: String,
    pub producer: PayloadProducer,
    /// When this payload was computed (RFC3339)
    pub computed_at_utc: String,
    /// Window the insight describes, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<WeekWindow>,
    pub insight: Insight,
    /// Pattern headline
    pub headline: String,
    /// Percent form (full tier only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentages: Option<ResponsePercentages>,
    /// Qualitative frequency rows (full tier only)
    pub frequency_labels: Vec<RankedResponse>,
    /// Caller may surface a support-resource prompt
    pub offer_support: bool,
}

/// Encoded interference summary for one calendar week
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterferencePayload {
    pub payload_version: String,
    pub producer: PayloadProducer,
    /// When this payload was computed (RFC3339)
    pub computed_at_utc: String,
    pub summary: InterferenceSummary,
}

/// Insight payload encoder
pub struct InsightEncoder {
    instance_id: String,
}

impl Default for InsightEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    fn producer(&self) -> PayloadProducer {
        PayloadProducer {
            name: PRODUCER_NAME.to_string(),
            version: INSIGHTS_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }

    pub fn encode(&self, insight: &Insight, window: Option<&WeekWindow>) -> InsightPayload {
        let percentages = if insight.show_frequency_labels() {
            insight.percentages()
        } else {
            None
        };

        InsightPayload {
            payload_version: PAYLOAD_VERSION.to_string(),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            window: window.cloned(),
            insight: insight.clone(),
            headline: insight.dominant_pattern.headline().to_string(),
            percentages,
            frequency_labels: insight.frequency_labels(),
            offer_support: insight.should_offer_support(),
        }
    }

    /// Encode to compact JSON
    pub fn encode_to_json(
        &self,
        insight: &Insight,
        window: Option<&WeekWindow>,
    ) -> Result<String, ComputeError> {
        let payload = self.encode(insight, window);
        serde_json::to_string(&payload).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Encode to pretty-printed JSON
    pub fn encode_to_json_pretty(
        &self,
        insight: &Insight,
        window: Option<&WeekWindow>,
    ) -> Result<String, ComputeError> {
        let payload = self.encode(insight, window);
        serde_json::to_string_pretty(&payload)
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    pub fn encode_interference(&self, summary: &InterferenceSummary) -> InterferencePayload {
        InterferencePayload {
            payload_version: PAYLOAD_VERSION.to_string(),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            summary: summary.clone(),
        }
    }

    pub fn encode_interference_to_json(
        &self,
        summary: &InterferenceSummary,
    ) -> Result<String, ComputeError> {
        serde_json::to_string(&self.encode_interference(summary))
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    pub fn encode_interference_to_json_pretty(
        &self,
        summary: &InterferenceSummary,
    ) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(&self.encode_interference(summary))
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}
