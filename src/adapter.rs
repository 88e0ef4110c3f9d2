//! Moment record adapter
//!
//! Parses stored moment rows (JSON array or NDJSON) and converts them into
//! typed [`ResponseEvent`]s. Unknown response categories are rejected here,
//! at the boundary, rather than silently miscounted later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ComputeError, ValidationError};
use crate::types::{Location, ResponseCategory, ResponseEvent};

/// A moment row as it comes out of the store.
///
/// Field aliases accept the column names used by the hosted table
/// (`created_at`, `urge`, `response_type`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentRecord {
    pub id: String,
    #[serde(alias = "created_at")]
    pub occurred_at: DateTime<Utc>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_location: Option<String>,
    #[serde(alias = "urge")]
    pub description: String,
    #[serde(alias = "response_type")]
    pub response_category: String,
    /// Owner column, if the export carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl MomentRecord {
    /// Convert to a typed event
    pub fn to_event(&self) -> Result<ResponseEvent, ComputeError> {
        let response_category: ResponseCategory = self.response_category.parse()?;
        Ok(ResponseEvent {
            id: self.id.clone(),
            occurred_at: self.occurred_at,
            location: Location::from_parts(&self.location, self.custom_location.as_deref()),
            description: self.description.clone(),
            response_category,
        })
    }
}

/// Parse a JSON array of moment records
pub fn parse_records(json: &str) -> Result<Vec<MomentRecord>, ComputeError> {
    serde_json::from_str(json)
        .map_err(|e| ComputeError::ParseError(format!("Failed to parse moment records: {}", e)))
}

/// Parse newline-delimited moment records, skipping blank lines
pub fn parse_records_ndjson(input: &str) -> Result<Vec<MomentRecord>, ComputeError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line.trim()).map_err(|e| {
                ComputeError::ParseError(format!("Line {}: {}", index + 1, e))
            })
        })
        .collect()
}

/// Records belonging to `owner`. Records without an owner column never match.
pub fn records_for_owner(records: Vec<MomentRecord>, owner: &str) -> Vec<MomentRecord> {
    let before = records.len();
    let owned: Vec<MomentRecord> = records
        .into_iter()
        .filter(|r| r.user_id.as_deref() == Some(owner))
        .collect();
    tracing::debug!(
        owner,
        kept = owned.len(),
        dropped = before - owned.len(),
        "Filtered records by owner"
    );
    owned
}

/// Convert records to events, failing on the first invalid category
pub fn records_to_events(records: &[MomentRecord]) -> Result<Vec<ResponseEvent>, ComputeError> {
    records
        .iter()
        .map(|record| {
            record.to_event().map_err(|e| {
                tracing::warn!(id = %record.id, error = %e, "Rejected moment record");
                e
            })
        })
        .collect()
}

/// Parse a JSON array straight into events
pub fn parse_events(json: &str) -> Result<Vec<ResponseEvent>, ComputeError> {
    records_to_events(&parse_records(json)?)
}

/// Parse NDJSON straight into events
pub fn parse_events_ndjson(input: &str) -> Result<Vec<ResponseEvent>, ComputeError> {
    records_to_events(&parse_records_ndjson(input)?)
}

/// Problem found with one record
#[derive(Debug)]
pub struct RecordIssue {
    /// Position in the input
    pub index: usize,
    pub id: String,
    pub error: ComputeError,
}

/// Check every record and report all failures, not just the first
pub fn validate_records(records: &[MomentRecord]) -> Vec<RecordIssue> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let outcome = record
                .to_event()
                .and_then(|event| event.validate().map_err(ComputeError::from));
            outcome.err().map(|error| RecordIssue {
                index,
                id: record.id.clone(),
                error,
            })
        })
        .collect()
}

/// Validate already-typed events
pub fn validate_events(events: &[ResponseEvent]) -> Vec<(usize, ValidationError)> {
    events
        .iter()
        .enumerate()
        .filter_map(|(index, event)| event.validate().err().map(|e| (index, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records_json() -> &'static str {
        r#"[
            {
                "id": "m-1",
                "created_at": "2024-01-15T14:01:00Z",
                "location": "home",
                "urge": "Checking locks",
                "response_type": "acted"
            },
            {
                "id": "m-2",
                "created_at": "2024-01-15T18:30:00Z",
                "location": "other",
                "custom_location": "Gym",
                "urge": "Counting",
                "response_type": "waited"
            },
            {
                "id": "m-3",
                "occurred_at": "2024-01-16T08:00:00Z",
                "location": "work",
                "description": "Email checking",
                "response_category": "noticed_without_acting"
            }
        ]"#
    }

    #[test]
    fn test_parse_events() {
        let events = parse_events(sample_records_json()).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].response_category, ResponseCategory::Acted);
        assert_eq!(events[1].location, Location::Other("Gym".to_string()));
        assert_eq!(events[1].response_category, ResponseCategory::Paused);
        assert_eq!(events[2].description, "Email checking");
        assert_eq!(events[2].response_category, ResponseCategory::Noticed);
    }

    #[test]
    fn test_parse_ndjson() {
        let input = r#"{"id":"a","created_at":"2024-01-15T14:01:00Z","location":"home","urge":"x","response_type":"acted"}

{"id":"b","created_at":"2024-01-15T15:01:00Z","location":"social","urge":"y","response_type":"noticed"}
"#;
        let events = parse_events_ndjson(input).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].location, Location::Social);
    }

    #[test]
    fn test_ndjson_error_reports_line() {
        let input = "{\"id\":\"a\"}\n";
        let err = parse_records_ndjson(input).unwrap_err();
        assert!(err.to_string().contains("Line 1"));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let json = r#"[{
            "id": "m-9",
            "created_at": "2024-01-15T14:01:00Z",
            "location": "home",
            "urge": "Checking",
            "response_type": "ignored"
        }]"#;
        let err = parse_events(json).unwrap_err();
        assert!(matches!(err, ComputeError::InvalidResponseCategory(ref v) if v == "ignored"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse_events("not json"), Err(ComputeError::ParseError(_))));
    }

    #[test]
    fn test_validate_records_collects_all() {
        let json = r#"[
            {"id": "ok", "created_at": "2024-01-15T14:01:00Z", "location": "home", "urge": "x", "response_type": "acted"},
            {"id": "bad-cat", "created_at": "2024-01-15T14:01:00Z", "location": "home", "urge": "x", "response_type": "maybe"},
            {"id": "blank", "created_at": "2024-01-15T14:01:00Z", "location": "home", "urge": "  ", "response_type": "acted"}
        ]"#;
        let records = parse_records(json).unwrap();
        let issues = validate_records(&records);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].index, 1);
        assert!(matches!(issues[0].error, ComputeError::InvalidResponseCategory(_)));
        assert_eq!(issues[1].id, "blank");
        assert!(matches!(issues[1].error, ComputeError::InvalidMoment(_)));
    }

    #[test]
    fn test_records_for_owner() {
        let json = r#"[
            {"id": "1", "user_id": "alice", "created_at": "2024-01-15T09:00:00Z", "location": "home", "urge": "x", "response_type": "acted"},
            {"id": "2", "user_id": "bob", "created_at": "2024-01-15T10:00:00Z", "location": "home", "urge": "y", "response_type": "acted"},
            {"id": "3", "created_at": "2024-01-15T11:00:00Z", "location": "home", "urge": "z", "response_type": "acted"}
        ]"#;
        let owned = records_for_owner(parse_records(json).unwrap(), "alice");
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, "1");
        assert!(records_for_owner(parse_records(json).unwrap(), "carol").is_empty());
    }

    #[test]
    fn test_validate_events() {
        let mut events = parse_events(sample_records_json()).unwrap();
        assert!(validate_events(&events).is_empty());

        events[2].description.clear();
        let issues = validate_events(&events);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].0, 2);
    }
}
