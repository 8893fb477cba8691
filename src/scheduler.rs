// Date scheduling for milestone sequences and task ranges

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::config::SchedulingConfig;
use crate::parsers::text::first_integer;

/// A resolved start/due pair with due >= start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateSpan {
    pub start: NaiveDate,
    pub due: NaiveDate,
}

/// Dates an entity declared, before scheduling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeclaredDates<'a> {
    pub start: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    pub duration: Option<&'a str>,
}

/// Longest duration a milestone may declare; larger values are clamped
pub const MAX_DURATION_WEEKS: u32 = 520;

/// Week count from a duration string: first integer token, or the default
/// when the text has none. "2-3 weeks" is two weeks.
pub fn parse_duration_weeks(duration: Option<&str>, default_weeks: u32) -> u32 {
    duration
        .and_then(first_integer)
        .filter(|weeks| *weeks > 0)
        .map(|weeks| weeks.min(MAX_DURATION_WEEKS))
        .unwrap_or(default_weeks)
}

/// `date + days`, or None when the result leaves the calendar range
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|delta| date.checked_add_signed(delta))
}

/// `date + days`, pinned to the calendar bounds instead of overflowing
pub fn add_days_saturating(date: NaiveDate, days: i64) -> NaiveDate {
    add_days(date, days).unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Replace an inverted due date with start + default length
pub fn repair_range(start: NaiveDate, due: NaiveDate, default_days: i64) -> DateSpan {
    if due < start {
        let repaired = add_days_saturating(start, default_days);
        log::debug!(
            "Repaired inverted range {}..{} to {}..{}",
            start,
            due,
            start,
            repaired
        );
        DateSpan {
            start,
            due: repaired,
        }
    } else {
        DateSpan { start, due }
    }
}

#[derive(Debug, Clone)]
pub struct DateScheduler {
    anchor: NaiveDate,
    default_weeks: u32,
    task_offset_days: i64,
    task_duration_days: i64,
}

impl DateScheduler {
    /// Scheduler with the stock rules (two-week milestones, tasks one day
    /// apart lasting three days)
    pub fn new(anchor: NaiveDate) -> Self {
        Self::with_rules(anchor, &SchedulingConfig::default())
    }

    pub fn with_rules(anchor: NaiveDate, rules: &SchedulingConfig) -> Self {
        Self {
            anchor,
            default_weeks: rules.default_milestone_weeks.max(1),
            task_offset_days: rules.task_offset_days,
            task_duration_days: rules.task_duration_days.max(1),
        }
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    pub fn task_offset_days(&self) -> i64 {
        self.task_offset_days
    }

    pub fn task_duration_days(&self) -> i64 {
        self.task_duration_days
    }

    fn default_days(&self) -> i64 {
        i64::from(self.default_weeks) * 7
    }

    /// Resolve one entity given the previous entity's due date
    pub fn next_span(&self, previous_due: Option<NaiveDate>, declared: DeclaredDates<'_>) -> DateSpan {
        let earliest = previous_due.map(|due| add_days_saturating(due, 1));
        let start = match (declared.start, earliest) {
            (Some(explicit), Some(earliest)) => explicit.max(earliest),
            (Some(explicit), None) => explicit,
            (None, Some(earliest)) => earliest,
            (None, None) => self.anchor,
        };

        let due = declared.due.unwrap_or_else(|| {
            let weeks = parse_duration_weeks(declared.duration, self.default_weeks);
            add_days_saturating(start, i64::from(weeks) * 7)
        });

        repair_range(start, due, self.default_days())
    }

    /// Chain a sequence so every entity starts after the previous one ends
    pub fn chain<'a>(&self, entities: impl IntoIterator<Item = DeclaredDates<'a>>) -> Vec<DateSpan> {
        entities
            .into_iter()
            .fold(Vec::new(), |mut spans: Vec<DateSpan>, declared| {
                let previous_due = spans.last().map(|span| span.due);
                spans.push(self.next_span(previous_due, declared));
                spans
            })
    }

    /// Task ranges get the same repair with the task default length
    pub fn repair_task_range(&self, start: NaiveDate, due: NaiveDate) -> DateSpan {
        repair_range(start, due, self.task_duration_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_duration_weeks() {
        assert_eq!(parse_duration_weeks(Some("2-3 weeks"), 2), 2);
        assert_eq!(parse_duration_weeks(Some("3 weeks"), 2), 3);
        assert_eq!(parse_duration_weeks(Some("a few weeks"), 2), 2);
        assert_eq!(parse_duration_weeks(Some("0 weeks"), 2), 2);
        assert_eq!(parse_duration_weeks(None, 4), 4);
    }

    #[test]
    fn test_chain_from_anchor() {
        let scheduler = DateScheduler::new(date(2025, 1, 1));
        let spans = scheduler.chain([
            DeclaredDates {
                duration: Some("2-3 weeks"),
                ..Default::default()
            },
            DeclaredDates {
                duration: Some("3 weeks"),
                ..Default::default()
            },
        ]);

        assert_eq!(spans[0], DateSpan { start: date(2025, 1, 1), due: date(2025, 1, 15) });
        assert_eq!(spans[1], DateSpan { start: date(2025, 1, 16), due: date(2025, 2, 6) });
    }

    #[test]
    fn test_explicit_start_cannot_overlap_previous() {
        let scheduler = DateScheduler::new(date(2025, 1, 1));
        let spans = scheduler.chain([
            DeclaredDates {
                start: Some(date(2025, 3, 1)),
                due: Some(date(2025, 3, 10)),
                duration: None,
            },
            DeclaredDates {
                start: Some(date(2025, 3, 5)),
                ..Default::default()
            },
            DeclaredDates {
                start: Some(date(2025, 6, 1)),
                ..Default::default()
            },
        ]);

        assert_eq!(spans[0].start, date(2025, 3, 1));
        assert_eq!(spans[1].start, date(2025, 3, 11));
        assert_eq!(spans[1].due, date(2025, 3, 25));
        // A later explicit start is kept
        assert_eq!(spans[2].start, date(2025, 6, 1));
    }

    #[test]
    fn test_inverted_due_is_repaired() {
        let scheduler = DateScheduler::new(date(2025, 1, 1));
        let span = scheduler.next_span(
            Some(date(2025, 2, 1)),
            DeclaredDates {
                due: Some(date(2025, 1, 20)),
                duration: Some("5 weeks"),
                ..Default::default()
            },
        );
        assert_eq!(span.start, date(2025, 2, 2));
        // Default length, not the declared one
        assert_eq!(span.due, date(2025, 2, 16));
    }

    #[test]
    fn test_oversized_durations_do_not_overflow() {
        let scheduler = DateScheduler::new(date(2025, 1, 1));
        let spans = scheduler.chain([
            DeclaredDates {
                duration: Some("100000000 weeks"),
                ..Default::default()
            },
            DeclaredDates {
                duration: Some("4000000000 weeks"),
                ..Default::default()
            },
        ]);

        assert_eq!(spans[0].due, date(2025, 1, 1) + Duration::days(i64::from(MAX_DURATION_WEEKS) * 7));
        assert!(spans[1].start > spans[0].due);
        assert!(spans.iter().all(|span| span.due >= span.start));
    }

    #[test]
    fn test_date_arithmetic_saturates_at_calendar_end() {
        assert_eq!(add_days(NaiveDate::MAX, 1), None);
        assert_eq!(add_days_saturating(NaiveDate::MAX, 1), NaiveDate::MAX);
        assert_eq!(add_days_saturating(NaiveDate::MIN, -1), NaiveDate::MIN);
        assert_eq!(add_days(date(2025, 1, 1), i64::MAX), None);

        let scheduler = DateScheduler::new(date(2025, 1, 1));
        let span = scheduler.next_span(Some(NaiveDate::MAX), DeclaredDates::default());
        assert_eq!(span, DateSpan { start: NaiveDate::MAX, due: NaiveDate::MAX });
    }

    #[test]
    fn test_task_range_repair() {
        let scheduler = DateScheduler::new(date(2025, 1, 1));
        let span = scheduler.repair_task_range(date(2025, 3, 10), date(2025, 3, 5));
        assert_eq!(span, DateSpan { start: date(2025, 3, 10), due: date(2025, 3, 13) });

        let span = scheduler.repair_task_range(date(2025, 3, 1), date(2025, 3, 1));
        assert_eq!(span.due, date(2025, 3, 1));
    }
}
