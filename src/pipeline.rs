//! Insight pipeline orchestration
//!
//! This module provides the public API that ties the pieces together:
//! window selection, fetching through an [`EventSource`], classification and
//! encoding.

use chrono::{DateTime, NaiveDate, Utc};

use crate::adapter::parse_events;
use crate::classifier::InsightClassifier;
use crate::config::InsightConfig;
use crate::encoder::InsightEncoder;
use crate::error::ComputeError;
use crate::interference::{
    parse_checkins, summarize_week, CalendarWeek, InterferenceSummary, WeeklyInterference,
};
use crate::phrasing::{PhrasePicker, RandomPicker};
use crate::store::{CheckinSource, EventSource};
use crate::types::{WeekWindow, WindowInsight, WindowKey};
use crate::window::WeekWindowCalculator;

/// Fetch and classify one of the owner's week windows.
///
/// A failing source yields [`WindowInsight::FetchFailed`], never an empty
/// insight. Only window computation itself can return an error.
pub fn weekly_insight<S, P>(
    source: &S,
    owner: &str,
    now: DateTime<Utc>,
    key: WindowKey,
    classifier: &mut InsightClassifier<P>,
) -> Result<WindowInsight, ComputeError>
where
    S: EventSource,
    P: PhrasePicker,
{
    let window = WeekWindowCalculator::window_for(now, key)?;

    match source.events_in_window(owner, window.start, window.end) {
        Ok(events) => {
            let insight = classifier.classify(&events);
            Ok(WindowInsight::Loaded { window, insight })
        }
        Err(e) => {
            tracing::warn!(window = key.as_str(), error = %e, "Failed to fetch moments");
            Ok(WindowInsight::FetchFailed {
                window,
                reason: e.to_string(),
            })
        }
    }
}

/// Insights for all three windows, most recent first
pub fn all_weekly_insights<S, P>(
    source: &S,
    owner: &str,
    now: DateTime<Utc>,
    classifier: &mut InsightClassifier<P>,
) -> Result<Vec<WindowInsight>, ComputeError>
where
    S: EventSource,
    P: PhrasePicker,
{
    WindowKey::ALL
        .iter()
        .map(|&key| weekly_insight(source, owner, now, key, classifier))
        .collect()
}

/// Fetch and summarize the owner's check-ins for the calendar week containing `day`.
///
/// As with [`weekly_insight`], a failing source yields
/// [`WeeklyInterference::FetchFailed`] rather than an empty week.
pub fn weekly_interference<S: CheckinSource>(
    source: &S,
    owner: &str,
    day: NaiveDate,
    config: &InsightConfig,
) -> Result<WeeklyInterference, ComputeError> {
    let week = CalendarWeek::containing(day)?;

    match source.checkins_between(owner, week.start, week.end) {
        Ok(checkins) => Ok(WeeklyInterference::Loaded {
            summary: summarize_week(day, &checkins, config)?,
        }),
        Err(e) => {
            tracing::warn!(week_start = %week.start, error = %e, "Failed to fetch check-ins");
            Ok(WeeklyInterference::FetchFailed {
                week,
                reason: e.to_string(),
            })
        }
    }
}

/// Convert a JSON array of check-ins into an interference payload for the
/// week containing `day` (stateless, one-shot).
pub fn checkins_to_interference_json(
    checkins_json: &str,
    day: NaiveDate,
) -> Result<String, ComputeError> {
    InsightProcessor::new().process_checkins(checkins_json, day)
}

/// Convert a JSON array of already-filtered moment records into an insight
/// payload (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let payload_json = events_to_insight_json(records_json)?;
/// ```
pub fn events_to_insight_json(events_json: &str) -> Result<String, ComputeError> {
    InsightProcessor::new().process(events_json, None)
}

/// Processor holding configuration, classifier and encoder across calls.
pub struct InsightProcessor<P: PhrasePicker = RandomPicker> {
    classifier: InsightClassifier<P>,
    encoder: InsightEncoder,
}

impl Default for InsightProcessor<RandomPicker> {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightProcessor<RandomPicker> {
    /// Default configuration
    pub fn new() -> Self {
        Self::with_config(InsightConfig::default())
    }

    pub fn with_config(config: InsightConfig) -> Self {
        Self::with_classifier(InsightClassifier::with_picker(config, RandomPicker::new()))
    }

    /// Reproducible sparse-tier wording
    pub fn seeded(config: InsightConfig, seed: u64) -> Self {
        Self::with_classifier(InsightClassifier::with_picker(
            config,
            RandomPicker::seeded(seed),
        ))
    }
}

impl<P: PhrasePicker> InsightProcessor<P> {
    pub fn with_classifier(classifier: InsightClassifier<P>) -> Self {
        Self {
            classifier,
            encoder: InsightEncoder::new(),
        }
    }

    pub fn config(&self) -> &InsightConfig {
        self.classifier.config()
    }

    /// Process a JSON array of moment records into payload JSON.
    ///
    /// The records must already be limited to one owner and one window;
    /// `window` only labels the payload.
    pub fn process(
        &mut self,
        events_json: &str,
        window: Option<&WeekWindow>,
    ) -> Result<String, ComputeError> {
        // Stage 1: Parse and type-check records
        let events = parse_events(events_json)?;

        // Stage 2: Classify
        let insight = self.classifier.classify(&events);

        // Stage 3: Encode
        self.encoder.encode_to_json(&insight, window)
    }

    /// Summarize the week of check-ins containing `day`
    pub fn summarize_checkins(
        &self,
        checkins_json: &str,
        day: NaiveDate,
    ) -> Result<InterferenceSummary, ComputeError> {
        let checkins = parse_checkins(checkins_json)?;
        summarize_week(day, &checkins, self.config())
    }

    /// Process a JSON array of check-ins into payload JSON
    pub fn process_checkins(
        &self,
        checkins_json: &str,
        day: NaiveDate,
    ) -> Result<String, ComputeError> {
        let summary = self.summarize_checkins(checkins_json, day)?;
        self.encoder.encode_interference_to_json(&summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interference::{InterferenceCheckin, InterferenceDomain, InterferenceLevel};
    use crate::phrasing::FixedPicker;
    use crate::store::MemoryEventStore;
    use crate::types::{
        DominantPattern, InsightTier, Location, ResponseCategory, ResponseEvent,
    };
    use chrono::{Duration, TimeZone};

    struct FailingSource;

    impl EventSource for FailingSource {
        type Error = String;

        fn events_in_window(
            &self,
            _owner: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<ResponseEvent>, String> {
            Err("connection reset".to_string())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 22, 12, 0, 0).unwrap()
    }

    fn classifier() -> InsightClassifier<FixedPicker> {
        InsightClassifier::with_picker(InsightConfig::default(), FixedPicker(0))
    }

    fn store() -> MemoryEventStore {
        let mut store = MemoryEventStore::new();
        let categories = [
            // this week: 3 acted, 1 paused
            (1, ResponseCategory::Acted),
            (2, ResponseCategory::Acted),
            (3, ResponseCategory::Acted),
            (4, ResponseCategory::Paused),
            // last week: 2 entries
            (8, ResponseCategory::Noticed),
            (9, ResponseCategory::Paused),
        ];
        for (i, (days_ago, category)) in categories.into_iter().enumerate() {
            let event = ResponseEvent::new(
                now() - Duration::days(days_ago),
                Location::Home,
                "Checking locks",
                category,
            )
            .with_id(format!("m-{i}"));
            store.record("alice", event).unwrap();
        }
        // Someone else's full week must not leak in
        for i in 0..5 {
            let event = ResponseEvent::new(
                now() - Duration::days(15) - Duration::hours(i),
                Location::Work,
                "Email checking",
                ResponseCategory::Noticed,
            )
            .with_id(format!("b-{i}"));
            store.record("bob", event).unwrap();
        }
        store
    }

    #[test]
    fn test_weekly_insight_this_week() {
        let result =
            weekly_insight(&store(), "alice", now(), WindowKey::ThisWeek, &mut classifier())
                .unwrap();
        let insight = result.insight().unwrap();
        assert_eq!(insight.tier, InsightTier::Full);
        assert_eq!(insight.dominant_pattern, DominantPattern::ActedDominant);
        assert!(!insight.all_events_acted);
        assert_eq!(result.window().end, now());
    }

    #[test]
    fn test_all_weekly_insights() {
        let results = all_weekly_insights(&store(), "alice", now(), &mut classifier()).unwrap();
        let tiers: Vec<InsightTier> = results
            .iter()
            .map(|r| r.insight().unwrap().tier)
            .collect();
        assert_eq!(
            tiers,
            vec![InsightTier::Full, InsightTier::Sparse, InsightTier::Empty]
        );
    }

    #[test]
    fn test_fetch_failure_is_not_empty() {
        let result =
            weekly_insight(&FailingSource, "alice", now(), WindowKey::LastWeek, &mut classifier())
                .unwrap();
        match result {
            WindowInsight::FetchFailed { window, reason } => {
                assert_eq!(window.key, WindowKey::LastWeek);
                assert_eq!(reason, "connection reset");
            }
            WindowInsight::Loaded { .. } => panic!("fetch failure reported as loaded"),
        }
    }

    struct UnreachableCheckins;

    impl CheckinSource for UnreachableCheckins {
        type Error = String;

        fn checkins_between(
            &self,
            _owner: &str,
            _first: NaiveDate,
            _last: NaiveDate,
        ) -> Result<Vec<InterferenceCheckin>, String> {
            Err("timeout".to_string())
        }
    }

    #[test]
    fn test_weekly_interference_from_store() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let mut store = MemoryEventStore::new();
        for (i, offset) in [0, 2, 7].into_iter().enumerate() {
            let checkin = InterferenceCheckin::new(format!("c{i}"), monday + Duration::days(offset))
                .with_rating(InterferenceDomain::WorkStudy, 2)
                .with_rating(InterferenceDomain::SleepRoutine, 3);
            store.record_checkin("alice", checkin).unwrap();
        }

        let wednesday = monday + Duration::days(2);
        let result =
            weekly_interference(&store, "alice", wednesday, &InsightConfig::default()).unwrap();
        let summary = result.summary().unwrap();
        assert_eq!(summary.checkin_count, 2);
        assert_eq!(summary.level, Some(InterferenceLevel::Low));
        assert_eq!(result.week().start, monday);

        let nobody = weekly_interference(&store, "bob", wednesday, &InsightConfig::default())
            .unwrap();
        assert_eq!(nobody.summary().unwrap().level, None);
    }

    #[test]
    fn test_interference_fetch_failure_is_not_empty() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();
        let result =
            weekly_interference(&UnreachableCheckins, "alice", day, &InsightConfig::default())
                .unwrap();
        assert!(result.summary().is_none());
        assert!(matches!(
            result,
            WeeklyInterference::FetchFailed { ref reason, .. } if reason == "timeout"
        ));
    }

    #[test]
    fn test_checkins_to_interference_json() {
        let json = r#"[
            {"id": "1", "date": "2024-01-15", "work_study": 7, "relationships_social": 8, "sleep_routine": 3, "self_care": null},
            {"id": "2", "date": "2024-01-16", "work_study": 9, "relationships_social": 6}
        ]"#;
        let day = NaiveDate::from_ymd_opt(2024, 1, 18).unwrap();
        let payload: serde_json::Value =
            serde_json::from_str(&checkins_to_interference_json(json, day).unwrap()).unwrap();
        assert_eq!(payload["summary"]["checkin_count"], 2);
        assert_eq!(payload["summary"]["level"], "high");
        assert!(payload["summary"]["averages"]["self_care"].is_null());
    }

    #[test]
    fn test_events_to_insight_json() {
        let json = r#"[
            {"id": "1", "created_at": "2024-01-15T09:00:00Z", "location": "home", "urge": "a", "response_type": "acted"},
            {"id": "2", "created_at": "2024-01-15T10:00:00Z", "location": "home", "urge": "b", "response_type": "acted"},
            {"id": "3", "created_at": "2024-01-15T11:00:00Z", "location": "work", "urge": "c", "response_type": "acted"},
            {"id": "4", "created_at": "2024-01-15T12:00:00Z", "location": "social", "urge": "d", "response_type": "acted"},
            {"id": "5", "created_at": "2024-01-15T13:00:00Z", "location": "home", "urge": "e", "response_type": "acted"}
        ]"#;
        let payload: serde_json::Value =
            serde_json::from_str(&events_to_insight_json(json).unwrap()).unwrap();
        assert_eq!(payload["insight"]["tier"], "full");
        assert_eq!(payload["insight"]["all_events_acted"], true);
        assert_eq!(payload["offer_support"], true);
    }

    #[test]
    fn test_processor_rejects_unknown_category() {
        let json = r#"[{"id": "1", "created_at": "2024-01-15T09:00:00Z", "location": "home", "urge": "a", "response_type": "skipped"}]"#;
        let mut processor = InsightProcessor::seeded(InsightConfig::default(), 1);
        assert!(matches!(
            processor.process(json, None),
            Err(ComputeError::InvalidResponseCategory(_))
        ));
    }

    #[test]
    fn test_processor_respects_config() {
        let config = InsightConfig {
            sparse_threshold: 10,
            ..InsightConfig::default()
        };
        let mut processor = InsightProcessor::with_config(config);
        assert_eq!(processor.config().sparse_threshold, 10);

        let json = r#"[
            {"id": "1", "created_at": "2024-01-15T09:00:00Z", "location": "home", "urge": "a", "response_type": "acted"},
            {"id": "2", "created_at": "2024-01-15T10:00:00Z", "location": "home", "urge": "b", "response_type": "waited"},
            {"id": "3", "created_at": "2024-01-15T11:00:00Z", "location": "home", "urge": "c", "response_type": "waited"},
            {"id": "4", "created_at": "2024-01-15T12:00:00Z", "location": "home", "urge": "d", "response_type": "waited"}
        ]"#;
        let payload: serde_json::Value =
            serde_json::from_str(&processor.process(json, None).unwrap()).unwrap();
        assert_eq!(payload["insight"]["tier"], "sparse");
        assert_eq!(payload["insight"]["entries_until_full_analysis"], 7);
    }
}
