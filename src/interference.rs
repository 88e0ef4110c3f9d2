//! Daily interference check-ins and their weekly summary
//!
//! A check-in rates, on a 0-10 scale, how much urges got in the way of four
//! life domains on one day. Any rating may be left blank. Check-ins are
//! grouped into calendar weeks starting on Monday, averaged per domain with
//! blanks ignored, and summarized as high, low or varied interference.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::{InsightConfig, MAX_INTERFERENCE_RATING};
use crate::error::{ComputeError, ValidationError};

/// Life area rated in a check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterferenceDomain {
    WorkStudy,
    RelationshipsSocial,
    SleepRoutine,
    SelfCare,
}

impl InterferenceDomain {
    /// Domains in check-in order
    pub const ALL: [InterferenceDomain; 4] = [
        InterferenceDomain::WorkStudy,
        InterferenceDomain::RelationshipsSocial,
        InterferenceDomain::SleepRoutine,
        InterferenceDomain::SelfCare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterferenceDomain::WorkStudy => "work_study",
            InterferenceDomain::RelationshipsSocial => "relationships_social",
            InterferenceDomain::SleepRoutine => "sleep_routine",
            InterferenceDomain::SelfCare => "self_care",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InterferenceDomain::WorkStudy => "Work & Study",
            InterferenceDomain::RelationshipsSocial => "Relationships & Social",
            InterferenceDomain::SleepRoutine => "Sleep & Routine",
            InterferenceDomain::SelfCare => "Self-Care",
        }
    }
}

impl fmt::Display for InterferenceDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One day's check-in. Blank ratings are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterferenceCheckin {
    pub id: String,
    /// Calendar day the check-in describes
    pub date: NaiveDate,
    #[serde(default)]
    pub work_study: Option<u8>,
    #[serde(default)]
    pub relationships_social: Option<u8>,
    #[serde(default)]
    pub sleep_routine: Option<u8>,
    #[serde(default)]
    pub self_care: Option<u8>,
}

impl InterferenceCheckin {
    /// A check-in with every rating blank
    pub fn new(id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            date,
            work_study: None,
            relationships_social: None,
            sleep_routine: None,
            self_care: None,
        }
    }

    /// Set one domain's rating
    pub fn with_rating(mut self, domain: InterferenceDomain, rating: u8) -> Self {
        let slot = match domain {
            InterferenceDomain::WorkStudy => &mut self.work_study,
            InterferenceDomain::RelationshipsSocial => &mut self.relationships_social,
            InterferenceDomain::SleepRoutine => &mut self.sleep_routine,
            InterferenceDomain::SelfCare => &mut self.self_care,
        };
        *slot = Some(rating);
        self
    }

    pub fn rating(&self, domain: InterferenceDomain) -> Option<u8> {
        match domain {
            InterferenceDomain::WorkStudy => self.work_study,
            InterferenceDomain::RelationshipsSocial => self.relationships_social,
            InterferenceDomain::SleepRoutine => self.sleep_routine,
            InterferenceDomain::SelfCare => self.self_care,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        for domain in InterferenceDomain::ALL {
            if let Some(rating) = self.rating(domain) {
                if rating > MAX_INTERFERENCE_RATING {
                    return Err(ValidationError::RatingOutOfRange {
                        id: self.id.clone(),
                        domain: domain.as_str().to_string(),
                        rating,
                        max: MAX_INTERFERENCE_RATING,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Parse a JSON array of check-ins, validating each one
pub fn parse_checkins(json: &str) -> Result<Vec<InterferenceCheckin>, ComputeError> {
    let checkins: Vec<InterferenceCheckin> = serde_json::from_str(json)
        .map_err(|e| ComputeError::ParseError(format!("Failed to parse check-ins: {}", e)))?;
    validate_checkins(checkins)
}

/// Parse newline-delimited check-ins, skipping blank lines
pub fn parse_checkins_ndjson(input: &str) -> Result<Vec<InterferenceCheckin>, ComputeError> {
    let checkins = input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line.trim())
                .map_err(|e| ComputeError::ParseError(format!("Line {}: {}", index + 1, e)))
        })
        .collect::<Result<Vec<InterferenceCheckin>, ComputeError>>()?;
    validate_checkins(checkins)
}

fn validate_checkins(
    checkins: Vec<InterferenceCheckin>,
) -> Result<Vec<InterferenceCheckin>, ComputeError> {
    for checkin in &checkins {
        checkin.validate().map_err(|e| {
            tracing::warn!(id = %checkin.id, error = %e, "Rejected check-in");
            e
        })?;
    }
    Ok(checkins)
}

/// Inclusive Monday..Sunday calendar week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarWeek {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CalendarWeek {
    /// The Monday-start week containing `date`
    pub fn containing(date: NaiveDate) -> Result<Self, ComputeError> {
        let back = Duration::days(i64::from(date.weekday().num_days_from_monday()));
        let start = date.checked_sub_signed(back);
        let end = start.and_then(|s| s.checked_add_signed(Duration::days(6)));
        match (start, end) {
            (Some(start), Some(end)) => Ok(Self { start, end }),
            _ => Err(ComputeError::InvalidTimestamp(format!(
                "no complete calendar week contains {}",
                date
            ))),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Per-domain weekly averages. `None` when every rating for the domain was blank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainAverages {
    pub work_study: Option<f64>,
    pub relationships_social: Option<f64>,
    pub sleep_routine: Option<f64>,
    pub self_care: Option<f64>,
}

impl DomainAverages {
    pub fn compute(checkins: &[InterferenceCheckin]) -> Self {
        let average = |domain: InterferenceDomain| {
            let ratings: Vec<u32> = checkins
                .iter()
                .filter_map(|c| c.rating(domain))
                .map(u32::from)
                .collect();
            if ratings.is_empty() {
                None
            } else {
                Some(f64::from(ratings.iter().sum::<u32>()) / ratings.len() as f64)
            }
        };

        Self {
            work_study: average(InterferenceDomain::WorkStudy),
            relationships_social: average(InterferenceDomain::RelationshipsSocial),
            sleep_routine: average(InterferenceDomain::SleepRoutine),
            self_care: average(InterferenceDomain::SelfCare),
        }
    }

    pub fn get(&self, domain: InterferenceDomain) -> Option<f64> {
        match domain {
            InterferenceDomain::WorkStudy => self.work_study,
            InterferenceDomain::RelationshipsSocial => self.relationships_social,
            InterferenceDomain::SleepRoutine => self.sleep_routine,
            InterferenceDomain::SelfCare => self.self_care,
        }
    }

    /// Averages of the domains that had at least one rating
    pub fn present(&self) -> Vec<f64> {
        InterferenceDomain::ALL
            .iter()
            .filter_map(|&d| self.get(d))
            .collect()
    }
}

/// Overall weekly interference level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterferenceLevel {
    High,
    Low,
    Varied,
}

impl InterferenceLevel {
    pub fn summary_text(&self) -> &'static str {
        match self {
            InterferenceLevel::High => "OCD significantly interfered with daily life this week.",
            InterferenceLevel::Low => "Lower interference observed across most areas.",
            InterferenceLevel::Varied => "OCD had varied impact across life areas this week.",
        }
    }
}

/// High when at least half the rated domains (rounded up) average at or above
/// the high threshold, else low by the same rule, else varied. `None` when no
/// domain was rated.
pub fn interference_level(
    averages: &DomainAverages,
    config: &InsightConfig,
) -> Option<InterferenceLevel> {
    let present = averages.present();
    if present.is_empty() {
        return None;
    }

    let needed = (present.len() + 1) / 2;
    let high_at = f64::from(config.high_interference_threshold);
    let low_at = f64::from(config.low_interference_threshold);
    let high = present.iter().filter(|&&v| v >= high_at).count();
    let low = present.iter().filter(|&&v| v <= low_at).count();

    if high >= needed {
        Some(InterferenceLevel::High)
    } else if low >= needed {
        Some(InterferenceLevel::Low)
    } else {
        Some(InterferenceLevel::Varied)
    }
}

/// Summary of one calendar week of check-ins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterferenceSummary {
    pub week: CalendarWeek,
    /// Check-ins that fell inside the week
    pub checkin_count: usize,
    pub averages: DomainAverages,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<InterferenceLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_text: Option<String>,
}

/// Outcome of fetching and summarizing one calendar week of check-ins.
///
/// A failed fetch is its own state and never looks like a week without check-ins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WeeklyInterference {
    Loaded { summary: InterferenceSummary },
    FetchFailed { week: CalendarWeek, reason: String },
}

impl WeeklyInterference {
    pub fn week(&self) -> &CalendarWeek {
        match self {
            WeeklyInterference::Loaded { summary } => &summary.week,
            WeeklyInterference::FetchFailed { week, .. } => week,
        }
    }

    pub fn summary(&self) -> Option<&InterferenceSummary> {
        match self {
            WeeklyInterference::Loaded { summary } => Some(summary),
            WeeklyInterference::FetchFailed { .. } => None,
        }
    }
}

/// Summarize the week containing `day`. Check-ins outside that week are ignored.
pub fn summarize_week(
    day: NaiveDate,
    checkins: &[InterferenceCheckin],
    config: &InsightConfig,
) -> Result<InterferenceSummary, ComputeError> {
    let week = CalendarWeek::containing(day)?;
    let in_week: Vec<InterferenceCheckin> = checkins
        .iter()
        .filter(|c| week.contains(c.date))
        .cloned()
        .collect();

    let averages = DomainAverages::compute(&in_week);
    let level = interference_level(&averages, config);

    tracing::debug!(
        week_start = %week.start,
        checkins = in_week.len(),
        level = ?level,
        "Summarized interference week"
    );

    Ok(InterferenceSummary {
        week,
        checkin_count: in_week.len(),
        averages,
        level,
        summary_text: level.map(|l| l.summary_text().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        // January 2024: the 15th is a Monday
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn checkin(id: &str, date: NaiveDate, ratings: [Option<u8>; 4]) -> InterferenceCheckin {
        InterferenceCheckin {
            id: id.to_string(),
            date,
            work_study: ratings[0],
            relationships_social: ratings[1],
            sleep_routine: ratings[2],
            self_care: ratings[3],
        }
    }

    #[test]
    fn test_monday_start_week() {
        for d in 15..=21 {
            let week = CalendarWeek::containing(day(d)).unwrap();
            assert_eq!(week.start, day(15));
            assert_eq!(week.end, day(21));
        }
        assert_eq!(CalendarWeek::containing(day(14)).unwrap().start, day(8));
        assert_eq!(CalendarWeek::containing(day(22)).unwrap().start, day(22));
    }

    #[test]
    fn test_week_at_calendar_edge_rejected() {
        assert!(CalendarWeek::containing(NaiveDate::MAX).is_err());
    }

    #[test]
    fn test_averages_ignore_blank_ratings() {
        let checkins = vec![
            checkin("a", day(15), [Some(8), None, Some(2), None]),
            checkin("b", day(16), [Some(6), None, None, None]),
        ];
        let averages = DomainAverages::compute(&checkins);
        assert_eq!(averages.work_study, Some(7.0));
        assert_eq!(averages.relationships_social, None);
        assert_eq!(averages.sleep_routine, Some(2.0));
        assert_eq!(averages.present(), vec![7.0, 2.0]);
    }

    #[test]
    fn test_all_blank_week_has_no_level() {
        let checkins = vec![checkin("a", day(15), [None; 4])];
        let summary = summarize_week(day(17), &checkins, &InsightConfig::default()).unwrap();
        assert_eq!(summary.checkin_count, 1);
        assert_eq!(summary.averages, DomainAverages::default());
        assert_eq!(summary.level, None);
        assert_eq!(summary.summary_text, None);
    }

    #[test]
    fn test_empty_week() {
        let summary = summarize_week(day(17), &[], &InsightConfig::default()).unwrap();
        assert_eq!(summary.checkin_count, 0);
        assert_eq!(summary.level, None);
    }

    #[test]
    fn test_half_rounded_up_is_enough() {
        let config = InsightConfig::default();

        // 2 of 4 domains high: ceil(4/2) = 2
        let two_of_four = DomainAverages {
            work_study: Some(7.0),
            relationships_social: Some(9.0),
            sleep_routine: Some(5.0),
            self_care: Some(6.0),
        };
        assert_eq!(interference_level(&two_of_four, &config), Some(InterferenceLevel::High));

        // 1 of 3 rated domains high: ceil(3/2) = 2, not enough
        let one_of_three = DomainAverages {
            work_study: Some(8.0),
            relationships_social: Some(5.0),
            sleep_routine: Some(6.0),
            self_care: None,
        };
        assert_eq!(interference_level(&one_of_three, &config), Some(InterferenceLevel::Varied));

        // 2 of 3 low
        let two_of_three_low = DomainAverages {
            work_study: Some(4.0),
            relationships_social: Some(1.5),
            sleep_routine: Some(6.0),
            self_care: None,
        };
        assert_eq!(interference_level(&two_of_three_low, &config), Some(InterferenceLevel::Low));
    }

    #[test]
    fn test_high_checked_before_low() {
        let split = DomainAverages {
            work_study: Some(9.0),
            relationships_social: Some(8.0),
            sleep_routine: Some(1.0),
            self_care: Some(0.0),
        };
        assert_eq!(
            interference_level(&split, &InsightConfig::default()),
            Some(InterferenceLevel::High)
        );
    }

    #[test]
    fn test_summarize_only_counts_the_week() {
        let checkins = vec![
            checkin("before", day(14), [Some(10); 4]),
            checkin("mon", day(15), [Some(2), Some(3), Some(1), Some(4)]),
            checkin("sun", day(21), [Some(4), Some(3), Some(3), Some(2)]),
            checkin("after", day(22), [Some(10); 4]),
        ];
        let summary = summarize_week(day(18), &checkins, &InsightConfig::default()).unwrap();
        assert_eq!(summary.checkin_count, 2);
        assert_eq!(summary.level, Some(InterferenceLevel::Low));
        assert_eq!(
            summary.summary_text.as_deref(),
            Some("Lower interference observed across most areas.")
        );
    }

    #[test]
    fn test_rating_out_of_range_rejected() {
        let json = r#"[{"id": "x", "date": "2024-01-15", "work_study": 11}]"#;
        let err = parse_checkins(json).unwrap_err();
        assert!(matches!(
            err,
            ComputeError::InvalidMoment(ValidationError::RatingOutOfRange { rating: 11, .. })
        ));
    }

    #[test]
    fn test_parse_checkins_missing_ratings_are_blank() {
        let json = r#"[{"id": "x", "date": "2024-01-15", "self_care": 3, "sleep_routine": null}]"#;
        let checkins = parse_checkins(json).unwrap();
        assert_eq!(checkins[0].rating(InterferenceDomain::SelfCare), Some(3));
        assert_eq!(checkins[0].rating(InterferenceDomain::WorkStudy), None);
        assert_eq!(checkins[0].rating(InterferenceDomain::SleepRoutine), None);
    }

    #[test]
    fn test_parse_checkins_ndjson() {
        let input = "{\"id\":\"a\",\"date\":\"2024-01-15\",\"work_study\":5}\n\n{\"id\":\"b\",\"date\":\"2024-01-16\"}\n";
        assert_eq!(parse_checkins_ndjson(input).unwrap().len(), 2);
        assert!(parse_checkins_ndjson("{\"id\":\"a\"}").unwrap_err().to_string().contains("Line 1"));
    }

    #[test]
    fn test_with_rating_builder() {
        let c = InterferenceCheckin::new("c", day(15))
            .with_rating(InterferenceDomain::SleepRoutine, 6);
        assert_eq!(c.sleep_routine, Some(6));
        assert!(c.validate().is_ok());
        assert_eq!(InterferenceDomain::SleepRoutine.label(), "Sleep & Routine");
    }
}
