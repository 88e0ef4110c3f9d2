//! Moment and insight data types
//!
//! This module defines the logged response events and the derived values
//! (week windows, insights) that flow through the insight engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ComputeError, ValidationError};

/// Self-reported reaction to an urge.
///
/// The stored vocabulary is `acted`, `waited` and `noticed_without_acting`.
/// UI-facing aliases are accepted on input; anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResponseCategory {
    /// Acted on the urge
    Acted,
    /// Paused before responding
    Paused,
    /// Noticed the urge without acting
    Noticed,
}

impl ResponseCategory {
    /// All categories in canonical order
    pub const ALL: [ResponseCategory; 3] = [
        ResponseCategory::Acted,
        ResponseCategory::Paused,
        ResponseCategory::Noticed,
    ];

    /// Stored wire value
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCategory::Acted => "acted",
            ResponseCategory::Paused => "waited",
            ResponseCategory::Noticed => "noticed_without_acting",
        }
    }

    /// Neutral display label
    pub fn label(&self) -> &'static str {
        match self {
            ResponseCategory::Acted => "Acting on the urge",
            ResponseCategory::Paused => "Waiting",
            ResponseCategory::Noticed => "Noticed without acting",
        }
    }

    /// Neutral symbol (circle variants, no right/wrong colouring)
    pub fn symbol(&self) -> &'static str {
        match self {
            ResponseCategory::Acted => "●",
            ResponseCategory::Paused => "◐",
            ResponseCategory::Noticed => "○",
        }
    }
}

impl FromStr for ResponseCategory {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "acted" => Ok(ResponseCategory::Acted),
            "waited" | "paused" | "delayed" => Ok(ResponseCategory::Paused),
            "noticed_without_acting" | "noticed" | "resisted" => Ok(ResponseCategory::Noticed),
            other => Err(ComputeError::InvalidResponseCategory(other.to_string())),
        }
    }
}

impl TryFrom<String> for ResponseCategory {
    type Error = ComputeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResponseCategory> for String {
    fn from(category: ResponseCategory) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for ResponseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the moment happened.
///
/// Serialized as `"home"`, `"work"`, `"social"` or `{"other": "<text>"}`, so
/// free text that spells a fixed name still reloads as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Home,
    Work,
    Social,
    /// Free-text location entered when "other" was chosen
    Other(String),
}

impl Location {
    /// Build a location from a stored location value and an optional custom name.
    ///
    /// Known values match case-insensitively. `other` takes the custom name
    /// when one is present.
    pub fn from_parts(location: &str, custom: Option<&str>) -> Self {
        match location.trim().to_ascii_lowercase().as_str() {
            "home" => Location::Home,
            "work" => Location::Work,
            "social" => Location::Social,
            "other" => match custom.map(str::trim).filter(|c| !c.is_empty()) {
                Some(name) => Location::Other(name.to_string()),
                None => Location::Other("other".to_string()),
            },
            _ => Location::Other(location.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Location::Home => "home",
            Location::Work => "work",
            Location::Social => "social",
            Location::Other(name) => name.as_str(),
        }
    }

    /// Display label
    pub fn label(&self) -> &str {
        match self {
            Location::Home => "At Home",
            Location::Work => "At Work",
            Location::Social => "Social",
            Location::Other(name) => name.as_str(),
        }
    }
}

/// A single logged moment. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEvent {
    /// Opaque identifier
    pub id: String,
    /// When the moment was logged
    pub occurred_at: DateTime<Utc>,
    /// Where it happened
    pub location: Location,
    /// Free-text description of the urge or thought
    pub description: String,
    /// Self-reported response
    pub response_category: ResponseCategory,
}

impl ResponseEvent {
    /// Create a new moment with a fresh id
    pub fn new(
        occurred_at: DateTime<Utc>,
        location: Location,
        description: impl Into<String>,
        response_category: ResponseCategory,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            occurred_at,
            location,
            description: description.into(),
            response_category,
        }
    }

    /// Replace the generated id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Validate the moment's free-text fields
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription {
                id: self.id.clone(),
            });
        }
        if let Location::Other(name) = &self.location {
            if name.trim().is_empty() {
                return Err(ValidationError::EmptyCustomLocation {
                    id: self.id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Which of the three selectable weeks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKey {
    ThisWeek,
    LastWeek,
    TwoWeeksAgo,
}

impl WindowKey {
    /// Keys in most-recent-first order
    pub const ALL: [WindowKey; 3] = [
        WindowKey::ThisWeek,
        WindowKey::LastWeek,
        WindowKey::TwoWeeksAgo,
    ];

    /// Number of whole weeks before the current one
    pub fn weeks_back(&self) -> i64 {
        match self {
            WindowKey::ThisWeek => 0,
            WindowKey::LastWeek => 1,
            WindowKey::TwoWeeksAgo => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WindowKey::ThisWeek => "this_week",
            WindowKey::LastWeek => "last_week",
            WindowKey::TwoWeeksAgo => "two_weeks_ago",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WindowKey::ThisWeek => "This Week",
            WindowKey::LastWeek => "Last Week",
            WindowKey::TwoWeeksAgo => "2 Weeks Ago",
        }
    }
}

impl FromStr for WindowKey {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "this_week" => Ok(WindowKey::ThisWeek),
            "last_week" => Ok(WindowKey::LastWeek),
            "two_weeks_ago" => Ok(WindowKey::TwoWeeksAgo),
            _ => Err(ComputeError::UnknownWindow(s.to_string())),
        }
    }
}

/// A half-open `[start, end)` reporting window. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekWindow {
    pub key: WindowKey,
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WeekWindow {
    /// Create a window, rejecting empty or inverted bounds
    pub fn new(
        key: WindowKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, ComputeError> {
        if start >= end {
            return Err(ComputeError::InvalidWindow(format!(
                "start {} is not before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self {
            key,
            label: key.label().to_string(),
            start,
            end,
        })
    }

    /// Whether the instant falls inside `[start, end)`
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Data-sufficiency tier gating what conclusions may be displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightTier {
    /// No moments in the window
    Empty,
    /// Too few moments for a pattern
    Sparse,
    /// Enough moments for pattern analysis
    Full,
}

/// Dominant behavioural pattern in a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DominantPattern {
    ActedDominant,
    PausedDominant,
    NoticedDominant,
    Mixed,
    InsufficientData,
}

impl DominantPattern {
    /// Short neutral headline
    pub fn headline(&self) -> &'static str {
        match self {
            DominantPattern::ActedDominant => "Immediate reactions",
            DominantPattern::PausedDominant => "Pauses before responding",
            DominantPattern::NoticedDominant => "Noticing without acting",
            DominantPattern::Mixed => "Mixed responses",
            DominantPattern::InsufficientData => "Not enough entries yet",
        }
    }
}

/// Per-category counts for one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCounts {
    pub acted: u32,
    pub paused: u32,
    pub noticed: u32,
}

impl ResponseCounts {
    /// Count categories across a set of moments
    pub fn tally<'a>(events: impl IntoIterator<Item = &'a ResponseEvent>) -> Self {
        let mut counts = Self::default();
        for event in events {
            match event.response_category {
                ResponseCategory::Acted => counts.acted += 1,
                ResponseCategory::Paused => counts.paused += 1,
                ResponseCategory::Noticed => counts.noticed += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> u32 {
        self.acted + self.paused + self.noticed
    }

    pub fn get(&self, category: ResponseCategory) -> u32 {
        match category {
            ResponseCategory::Acted => self.acted,
            ResponseCategory::Paused => self.paused,
            ResponseCategory::Noticed => self.noticed,
        }
    }

    /// Percent form of the counts, or `None` for an empty window.
    ///
    /// Each share is rounded half-up on its own, so the three values may sum
    /// to 99 or 101.
    pub fn percentages(&self) -> Option<ResponsePercentages> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some(ResponsePercentages {
            acted: percent_half_up(self.acted, total),
            paused: percent_half_up(self.paused, total),
            noticed: percent_half_up(self.noticed, total),
        })
    }
}

/// floor(count * 100 / total + 0.5) in integer arithmetic
fn percent_half_up(count: u32, total: u32) -> u32 {
    let count = u64::from(count);
    let total = u64::from(total);
    ((count * 200 + total) / (total * 2)) as u32
}

/// Counts expressed as whole percentages of the window total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePercentages {
    pub acted: u32,
    pub paused: u32,
    pub noticed: u32,
}

/// Qualitative frequency label shown next to a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyLabel {
    MoreOften,
    Sometimes,
    LessOften,
}

impl FrequencyLabel {
    pub fn as_text(&self) -> &'static str {
        match self {
            FrequencyLabel::MoreOften => "More often",
            FrequencyLabel::Sometimes => "Sometimes",
            FrequencyLabel::LessOften => "Less often",
        }
    }
}

/// One row of the frequency listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedResponse {
    pub category: ResponseCategory,
    pub count: u32,
    pub label: FrequencyLabel,
}

/// Summary of one window's moments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    /// Data-sufficiency tier
    pub tier: InsightTier,
    /// Dominant pattern (only meaningful when tier is not empty)
    pub dominant_pattern: DominantPattern,
    /// Main summary sentence (absent for an empty window)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_text: Option<String>,
    /// Supporting sentence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_text: Option<String>,
    /// Per-category counts
    pub counts: ResponseCounts,
    /// Every moment in the window was acted on
    pub all_events_acted: bool,
    /// Entries still needed before pattern analysis (sparse tier only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries_until_full_analysis: Option<u32>,
}

impl Insight {
    pub fn total(&self) -> u32 {
        self.counts.total()
    }

    /// Whether comparative frequency labels may be displayed
    pub fn show_frequency_labels(&self) -> bool {
        self.tier == InsightTier::Full
    }

    /// Hook for a support-resource prompt. The caller decides whether to show it.
    pub fn should_offer_support(&self) -> bool {
        self.tier == InsightTier::Full && self.all_events_acted
    }

    /// Percent form of the counts
    pub fn percentages(&self) -> Option<ResponsePercentages> {
        self.counts.percentages()
    }

    /// Present categories, most frequent first, with qualitative labels.
    ///
    /// Empty unless the tier is full. Equal counts share a label; when every
    /// present category ties they are all "Sometimes".
    pub fn frequency_labels(&self) -> Vec<RankedResponse> {
        if !self.show_frequency_labels() {
            return Vec::new();
        }

        let mut present: Vec<(ResponseCategory, u32)> = ResponseCategory::ALL
            .iter()
            .map(|&c| (c, self.counts.get(c)))
            .filter(|&(_, count)| count > 0)
            .collect();
        present.sort_by(|a, b| b.1.cmp(&a.1));

        let all_tied = present.len() > 1 && present.iter().all(|&(_, c)| c == present[0].1);

        let mut ranked = Vec::with_capacity(present.len());
        let mut rank = 0usize;
        let mut previous: Option<u32> = None;
        for (category, count) in present {
            if let Some(prev) = previous {
                if count < prev {
                    rank += 1;
                }
            }
            previous = Some(count);

            let label = if all_tied {
                FrequencyLabel::Sometimes
            } else {
                match rank {
                    0 => FrequencyLabel::MoreOften,
                    1 => FrequencyLabel::Sometimes,
                    _ => FrequencyLabel::LessOften,
                }
            };
            ranked.push(RankedResponse {
                category,
                count,
                label,
            });
        }
        ranked
    }
}

/// Outcome of fetching and classifying one window.
///
/// A failed fetch is its own state and never looks like an empty window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WindowInsight {
    Loaded { window: WeekWindow, insight: Insight },
    FetchFailed { window: WeekWindow, reason: String },
}

impl WindowInsight {
    pub fn window(&self) -> &WeekWindow {
        match self {
            WindowInsight::Loaded { window, .. } => window,
            WindowInsight::FetchFailed { window, .. } => window,
        }
    }

    pub fn insight(&self) -> Option<&Insight> {
        match self {
            WindowInsight::Loaded { insight, .. } => Some(insight),
            WindowInsight::FetchFailed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(category: ResponseCategory) -> ResponseEvent {
        ResponseEvent::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap(),
            Location::Home,
            "Checking locks",
            category,
        )
    }

    fn full_insight(counts: ResponseCounts) -> Insight {
        Insight {
            tier: InsightTier::Full,
            dominant_pattern: DominantPattern::Mixed,
            summary_text: None,
            secondary_text: None,
            counts,
            all_events_acted: false,
            entries_until_full_analysis: None,
        }
    }

    #[test]
    fn test_response_category_serialization() {
        let json = serde_json::to_string(&ResponseCategory::Paused).unwrap();
        assert_eq!(json, "\"waited\"");

        let parsed: ResponseCategory = serde_json::from_str("\"noticed_without_acting\"").unwrap();
        assert_eq!(parsed, ResponseCategory::Noticed);
    }

    #[test]
    fn test_response_category_aliases() {
        assert_eq!("delayed".parse::<ResponseCategory>().unwrap(), ResponseCategory::Paused);
        assert_eq!("resisted".parse::<ResponseCategory>().unwrap(), ResponseCategory::Noticed);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let err = "ignored".parse::<ResponseCategory>().unwrap_err();
        assert!(matches!(err, ComputeError::InvalidResponseCategory(ref v) if v == "ignored"));

        let result: Result<ResponseCategory, _> = serde_json::from_str("\"ignored\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_location_serialization() {
        let parsed: Location = serde_json::from_str("\"work\"").unwrap();
        assert_eq!(parsed, Location::Work);

        let parsed: Location = serde_json::from_str(r#"{"other": "Grocery store"}"#).unwrap();
        assert_eq!(parsed, Location::Other("Grocery store".to_string()));
        assert_eq!(parsed.label(), "Grocery store");
    }

    #[test]
    fn test_custom_location_named_like_fixed_one_survives_reload() {
        let custom = Location::from_parts("other", Some("work"));
        assert_eq!(custom, Location::Other("work".to_string()));

        let json = serde_json::to_string(&custom).unwrap();
        assert_eq!(json, r#"{"other":"work"}"#);
        let reloaded: Location = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, custom);
        assert_ne!(reloaded, Location::Work);
    }

    #[test]
    fn test_location_from_parts() {
        assert_eq!(Location::from_parts("Home", None), Location::Home);
        assert_eq!(
            Location::from_parts("Other", Some(" Gym ")),
            Location::Other("Gym".to_string())
        );
        assert_eq!(
            Location::from_parts("other", Some("  ")),
            Location::Other("other".to_string())
        );
    }

    #[test]
    fn test_event_validation() {
        assert!(event(ResponseCategory::Acted).validate().is_ok());

        let mut blank = event(ResponseCategory::Acted).with_id("m-1");
        blank.description = "   ".to_string();
        assert_eq!(
            blank.validate(),
            Err(ValidationError::EmptyDescription {
                id: "m-1".to_string()
            })
        );

        let mut nameless = event(ResponseCategory::Acted).with_id("m-2");
        nameless.location = Location::Other(String::new());
        assert!(matches!(
            nameless.validate(),
            Err(ValidationError::EmptyCustomLocation { .. })
        ));

        assert_eq!(
            event(ResponseCategory::Acted).with_id("").validate(),
            Err(ValidationError::EmptyId)
        );
    }

    #[test]
    fn test_window_key_parsing() {
        assert_eq!("last-week".parse::<WindowKey>().unwrap(), WindowKey::LastWeek);
        assert_eq!("two_weeks_ago".parse::<WindowKey>().unwrap(), WindowKey::TwoWeeksAgo);
        assert!("next_week".parse::<WindowKey>().is_err());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        assert!(WeekWindow::new(WindowKey::ThisWeek, t, t).is_err());
        assert!(WeekWindow::new(WindowKey::ThisWeek, t, t - Duration::days(1)).is_err());
    }

    #[test]
    fn test_window_contains_is_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let window = WeekWindow::new(WindowKey::LastWeek, start, end).unwrap();

        assert!(window.contains(start));
        assert!(!window.contains(end));
        assert_eq!(window.label, "Last Week");
    }

    #[test]
    fn test_tally() {
        let events = vec![
            event(ResponseCategory::Acted),
            event(ResponseCategory::Acted),
            event(ResponseCategory::Noticed),
        ];
        let counts = ResponseCounts::tally(&events);
        assert_eq!(counts.acted, 2);
        assert_eq!(counts.paused, 0);
        assert_eq!(counts.noticed, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_percentages() {
        let counts = ResponseCounts {
            acted: 3,
            paused: 7,
            noticed: 0,
        };
        let pct = counts.percentages().unwrap();
        assert_eq!((pct.acted, pct.paused, pct.noticed), (30, 70, 0));
    }

    #[test]
    fn test_percentages_rounding_artifact_tolerated() {
        let counts = ResponseCounts {
            acted: 1,
            paused: 1,
            noticed: 1,
        };
        let pct = counts.percentages().unwrap();
        assert_eq!((pct.acted, pct.paused, pct.noticed), (33, 33, 33));
        let sum = pct.acted + pct.paused + pct.noticed;
        assert!((99..=101).contains(&sum));
    }

    #[test]
    fn test_percentages_round_half_up() {
        let counts = ResponseCounts {
            acted: 1,
            paused: 7,
            noticed: 0,
        };
        let pct = counts.percentages().unwrap();
        // 12.5 -> 13, 87.5 -> 88
        assert_eq!((pct.acted, pct.paused), (13, 88));
    }

    #[test]
    fn test_percentages_empty() {
        assert!(ResponseCounts::default().percentages().is_none());
    }

    #[test]
    fn test_frequency_labels_ordering() {
        let insight = full_insight(ResponseCounts {
            acted: 1,
            paused: 4,
            noticed: 2,
        });
        let ranked = insight.frequency_labels();
        let rows: Vec<(ResponseCategory, FrequencyLabel)> =
            ranked.iter().map(|r| (r.category, r.label)).collect();
        assert_eq!(
            rows,
            vec![
                (ResponseCategory::Paused, FrequencyLabel::MoreOften),
                (ResponseCategory::Noticed, FrequencyLabel::Sometimes),
                (ResponseCategory::Acted, FrequencyLabel::LessOften),
            ]
        );
    }

    #[test]
    fn test_frequency_labels_ties_share_label() {
        let insight = full_insight(ResponseCounts {
            acted: 3,
            paused: 3,
            noticed: 1,
        });
        let ranked = insight.frequency_labels();
        assert_eq!(ranked[0].label, FrequencyLabel::MoreOften);
        assert_eq!(ranked[1].label, FrequencyLabel::MoreOften);
        assert_eq!(ranked[2].label, FrequencyLabel::Sometimes);

        let even = full_insight(ResponseCounts {
            acted: 2,
            paused: 2,
            noticed: 2,
        });
        assert!(even
            .frequency_labels()
            .iter()
            .all(|r| r.label == FrequencyLabel::Sometimes));
    }

    #[test]
    fn test_frequency_labels_withheld_when_sparse() {
        let mut insight = full_insight(ResponseCounts {
            acted: 2,
            paused: 1,
            noticed: 0,
        });
        insight.tier = InsightTier::Sparse;
        assert!(insight.frequency_labels().is_empty());
    }

    #[test]
    fn test_window_insight_fetch_failed_has_no_insight() {
        let start = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let window =
            WeekWindow::new(WindowKey::ThisWeek, start, start + Duration::days(7)).unwrap();
        let state = WindowInsight::FetchFailed {
            window,
            reason: "offline".to_string(),
        };
        assert!(state.insight().is_none());

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "fetch_failed");
    }
}
