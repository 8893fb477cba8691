// Field extractors: labeled values, inline metadata and heading cleanup

use super::text::{find_iso_dates, has_list_marker, parse_iso_date, plain_text};
use crate::models::status::{normalize_milestone_status, normalize_task_status};
use crate::models::{MilestoneStatus, Priority, TaskStatus};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Labels a field line may carry. A field line is removed from the block
/// before task extraction runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLabel {
    Status,
    Priority,
    StartDate,
    DueDate,
    Dates,
    Duration,
    Description,
}

static FIELD_LINES: LazyLock<Vec<(FieldLabel, Regex)>> = LazyLock::new(|| {
    // Leading bullets, emoji and emphasis are skipped before the label
    let field = |label: &str| {
        Regex::new(&format!(
            r"(?i)^[^\p{{L}}\p{{N}}]*(?:{})\s*\**\s*[:=]\s*\**\s*(.*)$",
            label
        ))
        .unwrap()
    };
    vec![
        (FieldLabel::Status, field(r"status")),
        (FieldLabel::Priority, field(r"priority(?:\s+level)?")),
        (FieldLabel::StartDate, field(r"start(?:[\s_]*date)?")),
        (
            FieldLabel::DueDate,
            field(r"(?:due|end|target|completion)[\s_]*date|deadline|due"),
        ),
        (FieldLabel::Dates, field(r"dates?|date\s+range")),
        (
            FieldLabel::Duration,
            field(r"(?:estimated\s+)?(?:duration|timeline|timeframe|time\s*frame|time\s+estimate)"),
        ),
        (
            FieldLabel::Description,
            field(r"description|objective|goal|focus|purpose"),
        ),
    ]
});

static PRIORITY_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(high|medium|low|critical)[\s-]priority\b|\bpriority\s*[:=]?\s*\**\s*(high|medium|low|critical|urgent)\b|[\[(]\s*(high|medium|low)\s*[\])]").unwrap()
});

static INLINE_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bstatus\s*[:=]\s*\**\s*([a-z][a-z _-]*)").unwrap());

static INLINE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bstart(?:\s*date)?\s*[:=]?\s*\**\s*(\d{4}-\d{1,2}-\d{1,2})").unwrap()
});

static INLINE_DUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:due|end|deadline|by)(?:\s*date)?\s*[:=]?\s*\**\s*(\d{4}-\d{1,2}-\d{1,2})").unwrap()
});

static DURATION_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:\s*[-–]\s*\d+)?\s*(?:hours?|hrs?|days?|weeks?|wks?|months?))\b").unwrap()
});

static HEADING_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*[\(\[]([^\)\]]*\b(?:weeks?|wks?|days?|months?)\b[^\)\]]*)[\)\]]\s*$").unwrap()
});

static METADATA_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*[\(\[][^\)\]]*(?:priority|\bhigh\b|\bmedium\b|\blow\b|\d+\s*(?:hours?|hrs?|days?|weeks?)|\d{4}-\d{1,2}-\d{1,2}|status)[^\)\]]*[\)\]]").unwrap()
});

static CHECKBOX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[[ xX✓]?\]\s*").unwrap());

/// Which labeled field a line carries, with its raw value
pub fn match_field_line(line: &str) -> Option<(FieldLabel, String)> {
    FIELD_LINES.iter().find_map(|(label, re)| {
        re.captures(line)
            .and_then(|cap| cap.get(1))
            .map(|m| (*label, plain_text(m.as_str())))
    })
}

/// Labeled values found in a milestone block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockFields {
    pub status: Option<MilestoneStatus>,
    pub priority: Option<Priority>,
    pub start: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    pub duration: Option<String>,
    pub description: Option<String>,
}

impl BlockFields {
    /// Scan a block for labeled field lines; the first value for each label wins
    pub fn from_block(block: &str) -> Self {
        block
            .lines()
            .filter_map(match_field_line)
            .fold(Self::default(), |mut fields, (label, value)| {
                match label {
                    FieldLabel::Status => {
                        fields.status = fields.status.or_else(|| normalize_milestone_status(&value))
                    }
                    FieldLabel::Priority => {
                        fields.priority = fields.priority.or_else(|| Priority::parse_loose(&value))
                    }
                    FieldLabel::StartDate => {
                        fields.start = fields.start.or_else(|| parse_iso_date(&value))
                    }
                    FieldLabel::DueDate => fields.due = fields.due.or_else(|| parse_iso_date(&value)),
                    FieldLabel::Dates => {
                        let dates = find_iso_dates(&value);
                        fields.start = fields.start.or(dates.first().copied());
                        fields.due = fields.due.or(dates.get(1).copied());
                    }
                    FieldLabel::Duration => {
                        if fields.duration.is_none() && !value.is_empty() {
                            fields.duration = Some(value);
                        }
                    }
                    FieldLabel::Description => {
                        if fields.description.is_none() && !value.is_empty() {
                            fields.description = Some(value);
                        }
                    }
                }
                fields
            })
    }
}

/// Remove labeled field lines so they are never mistaken for tasks
pub fn strip_field_lines(block: &str) -> String {
    block
        .lines()
        .filter(|line| match_field_line(line).is_none())
        .collect::<Vec<_>>()
        .join("\n")
}

/// First prose line of a block: not a field, list item or table row
pub fn leading_paragraph(block: &str) -> Option<String> {
    block
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take_while(|line| !has_list_marker(line) && !line.starts_with('|'))
        .find(|line| match_field_line(line).is_none())
        .map(plain_text)
        .filter(|text| !text.is_empty())
}

/// Milestone name without a trailing "(2-3 weeks)" style hint, and the hint
pub fn clean_heading(label: &str) -> (String, Option<String>) {
    match HEADING_DURATION.captures(label) {
        Some(cap) => {
            let name = label[..cap.get(0).map_or(label.len(), |m| m.start())]
                .trim()
                .trim_end_matches(|c: char| c == '-' || c == '–' || c == ':')
                .trim()
                .to_string();
            let hint = cap.get(1).map(|m| m.as_str().trim().to_string());
            // "(Weeks 1-4)" names a position in the calendar, not a length
            let duration = hint.filter(|h| !h.to_lowercase().starts_with("week"));
            (name, duration)
        }
        None => (label.trim().to_string(), None),
    }
}

/// Priority mentioned anywhere in a line ("High priority", "(high)", "Priority: low")
pub fn inline_priority(text: &str) -> Option<Priority> {
    let cap = PRIORITY_PHRASE.captures(text)?;
    (1..=3)
        .filter_map(|i| cap.get(i))
        .find_map(|m| Priority::parse_loose(m.as_str()))
}

pub fn inline_task_status(text: &str) -> Option<TaskStatus> {
    let value = INLINE_STATUS.captures(text)?.get(1)?.as_str();
    let words: Vec<&str> = value.split_whitespace().collect();
    // "Status: on hold until funding" -> try "on hold", then "on"
    (1..=words.len().min(2))
        .rev()
        .find_map(|n| normalize_task_status(&words[..n].join(" ")))
}

pub fn inline_duration(text: &str) -> Option<String> {
    DURATION_PHRASE
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// Explicit start/due dates in task text: labeled values first, otherwise
/// two bare dates are start and due, a single bare date is the due date
pub fn inline_dates(text: &str) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let start = INLINE_START
        .captures(text)
        .and_then(|cap| cap.get(1))
        .and_then(|m| parse_iso_date(m.as_str()));
    let due = INLINE_DUE
        .captures(text)
        .and_then(|cap| cap.get(1))
        .and_then(|m| parse_iso_date(m.as_str()));

    if start.is_some() || due.is_some() {
        return (start, due);
    }

    match find_iso_dates(text).as_slice() {
        [] => (None, None),
        [only] => (None, Some(*only)),
        [first, second, ..] => (Some(*first), Some(*second)),
    }
}

/// Task title without checkboxes and inline metadata groups
pub fn clean_task_title(title: &str) -> String {
    let without_checkbox = CHECKBOX.replace(title.trim(), "");
    let cleaned = METADATA_GROUP.replace_all(&without_checkbox, "");
    plain_text(cleaned.trim().trim_end_matches(':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_block_fields() {
        let block = "⏳ Duration: 2-3 weeks\n- **Status:** in progress\nPriority: High\nStartDate: 2025-02-01\nDue Date: 2025-02-20\n- Interview users";
        let fields = BlockFields::from_block(block);
        assert_eq!(fields.duration.as_deref(), Some("2-3 weeks"));
        assert_eq!(fields.status, Some(MilestoneStatus::InProgress));
        assert_eq!(fields.priority, Some(Priority::High));
        assert_eq!(fields.start, Some(date(2025, 2, 1)));
        assert_eq!(fields.due, Some(date(2025, 2, 20)));
    }

    #[test]
    fn test_dates_field_line() {
        let fields = BlockFields::from_block("Dates: 2025-01-06 to 2025-01-31");
        assert_eq!(fields.start, Some(date(2025, 1, 6)));
        assert_eq!(fields.due, Some(date(2025, 1, 31)));
    }

    #[test]
    fn test_strip_field_lines() {
        let block = "⏳ Duration: 2-3 weeks\n• Interview users\n- Priority: low\n• Draft brief";
        assert_eq!(strip_field_lines(block), "• Interview users\n• Draft brief");
    }

    #[test]
    fn test_leading_paragraph() {
        let block = "Duration: 2 weeks\nValidate demand before building.\n- Survey";
        assert_eq!(
            leading_paragraph(block).as_deref(),
            Some("Validate demand before building.")
        );
        assert_eq!(leading_paragraph("- only bullets"), None);
    }

    #[test]
    fn test_clean_heading() {
        assert_eq!(
            clean_heading("Discovery (2-3 weeks)"),
            ("Discovery".to_string(), Some("2-3 weeks".to_string()))
        );
        assert_eq!(clean_heading("Build (Weeks 4-8)"), ("Build".to_string(), None));
        assert_eq!(clean_heading("Launch"), ("Launch".to_string(), None));
    }

    #[test]
    fn test_inline_fields() {
        assert_eq!(inline_priority("Set up CRM (High priority)"), Some(Priority::High));
        assert_eq!(inline_priority("Priority: low"), Some(Priority::Low));
        assert_eq!(inline_priority("[medium] tidy docs"), Some(Priority::Medium));
        assert_eq!(inline_priority("Just a task"), None);

        assert_eq!(inline_task_status("Status: done"), Some(TaskStatus::Completed));
        assert_eq!(inline_duration("Write copy (2 days)").as_deref(), Some("2 days"));
    }

    #[test]
    fn test_inline_dates() {
        assert_eq!(
            inline_dates("Start: 2025-03-01, due 2025-03-05"),
            (Some(date(2025, 3, 1)), Some(date(2025, 3, 5)))
        );
        assert_eq!(
            inline_dates("2025-03-01 to 2025-03-09"),
            (Some(date(2025, 3, 1)), Some(date(2025, 3, 9)))
        );
        assert_eq!(inline_dates("finish by 2025-04-01"), (None, Some(date(2025, 4, 1))));
        assert_eq!(inline_dates("no dates"), (None, None));
    }

    #[test]
    fn test_clean_task_title() {
        assert_eq!(clean_task_title("[ ] Launch landing page (High priority)"), "Launch landing page");
        assert_eq!(clean_task_title("**Write copy** (2 days)"), "Write copy");
    }
}
