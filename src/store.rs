//! Event source collaborator
//!
//! The insight engine never reaches into storage itself. Callers fetch a
//! window's moments through an [`EventSource`] and hand the slice over.
//! [`MemoryEventStore`] is an in-memory stand-in that can be swapped for a
//! real backend without touching the engine.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::InsightConfig;
use crate::error::ComputeError;
use crate::interference::InterferenceCheckin;
use crate::types::{Location, ResponseEvent};

/// Query capability the insight pipeline depends on
pub trait EventSource {
    type Error: fmt::Display;

    /// The owner's moments with `occurred_at` in `[start, end)`, newest first
    fn events_in_window(
        &self,
        owner: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ResponseEvent>, Self::Error>;
}

/// Query capability the interference summary depends on
pub trait CheckinSource {
    type Error: fmt::Display;

    /// The owner's check-ins dated within `[first, last]`, oldest first
    fn checkins_between(
        &self,
        owner: &str,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<InterferenceCheckin>, Self::Error>;
}

/// Owner-scoped in-memory moment and check-in store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryEventStore {
    moments: HashMap<String, Vec<ResponseEvent>>,
    #[serde(default)]
    checkins: HashMap<String, Vec<InterferenceCheckin>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a moment for an owner. Duplicate ids for the same owner are rejected.
    pub fn record(&mut self, owner: &str, event: ResponseEvent) -> Result<(), ComputeError> {
        event.validate()?;
        let entries = self.moments.entry(owner.to_string()).or_default();
        if entries.iter().any(|e| e.id == event.id) {
            return Err(ComputeError::ParseError(format!(
                "moment {} already recorded",
                event.id
            )));
        }
        entries.push(event);
        Ok(())
    }

    /// Hard delete by id, scoped to the owner. Returns whether anything was removed.
    pub fn delete(&mut self, owner: &str, id: &str) -> bool {
        let Some(entries) = self.moments.get_mut(owner) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() != before;
        if removed {
            tracing::debug!(id, "Deleted moment");
        }
        removed
    }

    /// Record a daily check-in. Duplicate ids for the same owner are rejected.
    pub fn record_checkin(
        &mut self,
        owner: &str,
        checkin: InterferenceCheckin,
    ) -> Result<(), ComputeError> {
        checkin.validate()?;
        let entries = self.checkins.entry(owner.to_string()).or_default();
        if entries.iter().any(|c| c.id == checkin.id) {
            return Err(ComputeError::ParseError(format!(
                "check-in {} already recorded",
                checkin.id
            )));
        }
        entries.push(checkin);
        Ok(())
    }

    /// Number of moments held for an owner
    pub fn count(&self, owner: &str) -> usize {
        self.moments.get(owner).map_or(0, Vec::len)
    }

    /// Distinct descriptions among the owner's latest `limit` entries at a
    /// location, newest first
    pub fn recent_urges(&self, owner: &str, location: &Location, limit: usize) -> Vec<String> {
        let mut at_location: Vec<&ResponseEvent> = self
            .moments
            .get(owner)
            .map(|entries| entries.iter().filter(|e| &e.location == location).collect())
            .unwrap_or_default();
        at_location.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));

        let mut urges: Vec<String> = Vec::new();
        for event in at_location.into_iter().take(limit) {
            if !urges.contains(&event.description) {
                urges.push(event.description.clone());
            }
        }
        urges
    }

    /// [`recent_urges`](Self::recent_urges) with the configured limit
    pub fn urge_suggestions(
        &self,
        owner: &str,
        location: &Location,
        config: &InsightConfig,
    ) -> Vec<String> {
        self.recent_urges(owner, location, config.recent_urge_limit)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl EventSource for MemoryEventStore {
    type Error = ComputeError;

    fn events_in_window(
        &self,
        owner: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ResponseEvent>, ComputeError> {
        if start >= end {
            return Err(ComputeError::InvalidWindow(format!(
                "start {} is not before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }

        let mut events: Vec<ResponseEvent> = self
            .moments
            .get(owner)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| start <= e.occurred_at && e.occurred_at < end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(events)
    }
}

impl CheckinSource for MemoryEventStore {
    type Error = ComputeError;

    fn checkins_between(
        &self,
        owner: &str,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<InterferenceCheckin>, ComputeError> {
        if first > last {
            return Err(ComputeError::InvalidWindow(format!(
                "first day {} is after last day {}",
                first, last
            )));
        }

        let mut checkins: Vec<InterferenceCheckin> = self
            .checkins
            .get(owner)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|c| first <= c.date && c.date <= last)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        checkins.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(checkins)
    }
}
