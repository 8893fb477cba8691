// Intermediate records produced by the parsers, before scheduling

use super::{BudgetItem, CalendarWeek, MilestoneStatus, Priority, Risk, TaskStatus, Tip};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which document-level strategy produced a draft
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoadmapShape {
    /// Embedded JSON roadmap
    Json,
    /// Header-delimited markdown or plain-text sections
    Sections,
    /// Nothing recognizable; default graph synthesized
    Unstructured,
}

/// Task-extraction pattern adopted for a milestone block
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskPattern {
    TaskLabels,
    BoldNumbered,
    Numbered,
    Bullets,
    Table,
    Json,
}

impl TaskPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPattern::TaskLabels => "task labels",
            TaskPattern::BoldNumbered => "bold numbered list",
            TaskPattern::Numbered => "numbered list",
            TaskPattern::Bullets => "bullet list",
            TaskPattern::Table => "table",
            TaskPattern::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskDraft {
    pub name: String,
    pub description: String,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub start: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    pub estimated_duration: Option<String>,
}

impl TaskDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MilestoneDraft {
    pub name: String,
    pub description: String,
    pub status: Option<MilestoneStatus>,
    pub priority: Option<Priority>,
    pub start: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    /// Raw duration text such as "2-3 weeks"
    pub duration: Option<String>,
    pub tasks: Vec<TaskDraft>,
    /// None when no pattern matched and tasks must be synthesized
    pub task_pattern: Option<TaskPattern>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadmapDraft {
    pub shape: RoadmapShape,
    pub title: Option<String>,
    /// Explicit total budget line, if the text had one
    pub budget_total: Option<f64>,
    pub milestones: Vec<MilestoneDraft>,
    pub budget_items: Vec<BudgetItem>,
    pub calendar_weeks: Vec<CalendarWeek>,
    pub risks: Vec<Risk>,
    pub tips: Vec<Tip>,
}

impl RoadmapDraft {
    pub fn empty(shape: RoadmapShape) -> Self {
        Self {
            shape,
            title: None,
            budget_total: None,
            milestones: Vec::new(),
            budget_items: Vec::new(),
            calendar_weeks: Vec::new(),
            risks: Vec::new(),
            tips: Vec::new(),
        }
    }
}
