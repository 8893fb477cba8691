// JSON-shaped suggestion endpoints
//
// Model JSON is mapped onto a closed set of record shapes. Every field is
// validated on its own with an explicit default, and statuses go through the
// progress override before they are returned.

use super::embedded_json::extract_json_value;
use super::json_roadmap::{field, str_field};
use super::text::{parse_iso_date, plain_text};
use crate::error::IngestError;
use crate::models::status::{
    normalize_milestone_status, normalize_task_status, resolve_milestone_status,
    resolve_task_status, FieldSource,
};
use crate::models::{MilestoneStatus, Priority, TaskStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Progress the system already knows for entities a model may mention
pub trait ProgressLookup {
    fn milestone_progress(&self, title: &str) -> Option<u8>;
    fn task_progress(&self, title: &str) -> Option<u8>;
}

/// In-memory progress by title, matched case-insensitively
#[derive(Debug, Clone, Default)]
pub struct KnownProgress {
    milestones: HashMap<String, u8>,
    tasks: HashMap<String, u8>,
}

fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

impl KnownProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_milestone(mut self, title: &str, progress: u8) -> Self {
        self.milestones.insert(title_key(title), progress.min(100));
        self
    }

    pub fn with_task(mut self, title: &str, progress: u8) -> Self {
        self.tasks.insert(title_key(title), progress.min(100));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty() && self.tasks.is_empty()
    }
}

impl ProgressLookup for KnownProgress {
    fn milestone_progress(&self, title: &str) -> Option<u8> {
        self.milestones.get(&title_key(title)).copied()
    }

    fn task_progress(&self, title: &str) -> Option<u8> {
        self.tasks.get(&title_key(title)).copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneSuggestion {
    pub title: String,
    pub description: String,
    pub status: MilestoneStatus,
    pub status_source: FieldSource,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskSuggestion {
    pub title: String,
    pub description: String,
    /// Milestone the model placed the task under, if it named one
    pub milestone: Option<String>,
    pub status: TaskStatus,
    pub status_source: FieldSource,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub estimated_duration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecommendation {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: Option<String>,
    pub timeframe: Option<String>,
}

const TITLE_KEYS: &[&str] = &["title", "name", "milestone", "task", "action"];
const DESCRIPTION_KEYS: &[&str] = &["description", "details", "summary", "why"];
const DUE_KEYS: &[&str] = &["dueDate", "due_date", "deadline", "endDate", "end_date"];

/// Records under any of the wrapper keys, or the value itself
fn records<'a>(value: &'a Value, wrapper_keys: &[&str]) -> Vec<&'a Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => match field(value, wrapper_keys).and_then(Value::as_array) {
            Some(items) => items.iter().collect(),
            None => vec![value],
        },
        _ => Vec::new(),
    }
}

fn title_of(record: &Value) -> Option<String> {
    let title = plain_text(&str_field(record, TITLE_KEYS)?);
    if title.is_empty() {
        log::warn!("Skipping suggestion without a title: {}", record);
        return None;
    }
    Some(title)
}

fn priority_of(record: &Value) -> Priority {
    str_field(record, &["priority", "importance"])
        .and_then(|p| Priority::parse_loose(&p))
        .unwrap_or_default()
}

fn milestone_suggestion(record: &Value, progress: &dyn ProgressLookup) -> Option<MilestoneSuggestion> {
    if !record.is_object() {
        return None;
    }
    let title = title_of(record)?;
    let claimed = str_field(record, &["status"]).and_then(|s| normalize_milestone_status(&s));
    let status = resolve_milestone_status(progress.milestone_progress(&title), claimed);

    if status.source == FieldSource::Derived && claimed.is_some_and(|c| c != status.value) {
        log::info!(
            "Overriding claimed status {:?} for '{}' with {} from stored progress",
            claimed,
            title,
            status.value
        );
    }

    Some(MilestoneSuggestion {
        description: str_field(record, DESCRIPTION_KEYS).unwrap_or_default(),
        status: status.value,
        status_source: status.source,
        priority: priority_of(record),
        due_date: str_field(record, DUE_KEYS).and_then(|d| parse_iso_date(&d)),
        reason: str_field(record, &["reason", "rationale", "explanation"]),
        title,
    })
}

fn task_suggestion(record: &Value, progress: &dyn ProgressLookup) -> Option<TaskSuggestion> {
    if !record.is_object() {
        return None;
    }
    let title = title_of(record)?;
    let claimed = str_field(record, &["status"]).and_then(|s| normalize_task_status(&s));
    let status = resolve_task_status(progress.task_progress(&title), claimed);

    Some(TaskSuggestion {
        description: str_field(record, DESCRIPTION_KEYS).unwrap_or_default(),
        milestone: str_field(record, &["milestone", "milestoneTitle", "milestone_title", "phase"])
            .filter(|m| *m != title),
        status: status.value,
        status_source: status.source,
        priority: priority_of(record),
        due_date: str_field(record, DUE_KEYS).and_then(|d| parse_iso_date(&d)),
        estimated_duration: str_field(
            record,
            &["estimatedDuration", "estimated_duration", "duration", "timeframe"],
        ),
        title,
    })
}

fn action_recommendation(record: &Value) -> Option<ActionRecommendation> {
    if let Some(text) = record.as_str() {
        let title = plain_text(text);
        return (!title.is_empty()).then(|| ActionRecommendation {
            title,
            description: String::new(),
            priority: Priority::default(),
            category: None,
            timeframe: None,
        });
    }
    if !record.is_object() {
        return None;
    }

    Some(ActionRecommendation {
        title: title_of(record)?,
        description: str_field(record, DESCRIPTION_KEYS).unwrap_or_default(),
        priority: priority_of(record),
        category: str_field(record, &["category", "area", "type"]),
        timeframe: str_field(record, &["timeframe", "timeline", "when", "deadline"]),
    })
}

/// Milestone suggestions from a model response. A response without
/// parseable JSON is a terminal parse error.
pub fn parse_milestone_suggestions(
    text: &str,
    progress: &dyn ProgressLookup,
) -> Result<Vec<MilestoneSuggestion>, IngestError> {
    let value = extract_json_value(text)?;
    Ok(records(&value, &["milestones", "suggestions", "updates"])
        .into_iter()
        .filter_map(|record| milestone_suggestion(record, progress))
        .collect())
}

pub fn parse_task_suggestions(
    text: &str,
    progress: &dyn ProgressLookup,
) -> Result<Vec<TaskSuggestion>, IngestError> {
    let value = extract_json_value(text)?;
    Ok(records(&value, &["tasks", "suggestions", "updates"])
        .into_iter()
        .filter_map(|record| task_suggestion(record, progress))
        .collect())
}

pub fn parse_action_recommendations(text: &str) -> Result<Vec<ActionRecommendation>, IngestError> {
    let value = extract_json_value(text)?;
    Ok(records(&value, &["actions", "recommendations", "nextSteps", "next_steps"])
        .into_iter()
        .filter_map(action_recommendation)
        .collect())
}
