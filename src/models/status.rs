// Status normalization and the progress-derived status override

use super::{MilestoneStatus, TaskStatus};
use serde::{Deserialize, Serialize};

/// Where a resolved field value came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// Labeled value found in the model text
    Explicit,
    /// Computed from data the system already holds
    Derived,
    /// Context default
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: FieldSource,
}

impl<T> Resolved<T> {
    pub fn explicit(value: T) -> Self {
        Self { value, source: FieldSource::Explicit }
    }

    pub fn derived(value: T) -> Self {
        Self { value, source: FieldSource::Derived }
    }

    pub fn default_value(value: T) -> Self {
        Self { value, source: FieldSource::Default }
    }
}

/// Milestone status implied by stored progress
pub fn milestone_status_from_progress(progress: u8) -> MilestoneStatus {
    match progress {
        0 => MilestoneStatus::NotStarted,
        p if p >= 100 => MilestoneStatus::Completed,
        _ => MilestoneStatus::InProgress,
    }
}

/// Task status implied by stored progress
pub fn task_status_from_progress(progress: u8) -> TaskStatus {
    match progress {
        0 => TaskStatus::ToDo,
        p if p >= 100 => TaskStatus::Completed,
        _ => TaskStatus::InProgress,
    }
}

/// Resolve a milestone status. Known progress always wins over whatever the
/// model claimed, then the claim, then `planned`.
pub fn resolve_milestone_status(
    known_progress: Option<u8>,
    claimed: Option<MilestoneStatus>,
) -> Resolved<MilestoneStatus> {
    if let Some(progress) = known_progress {
        return Resolved::derived(milestone_status_from_progress(progress));
    }
    match claimed {
        Some(status) => Resolved::explicit(status),
        None => Resolved::default_value(MilestoneStatus::Planned),
    }
}

pub fn resolve_task_status(
    known_progress: Option<u8>,
    claimed: Option<TaskStatus>,
) -> Resolved<TaskStatus> {
    if let Some(progress) = known_progress {
        return Resolved::derived(task_status_from_progress(progress));
    }
    match claimed {
        Some(status) => Resolved::explicit(status),
        None => Resolved::default_value(TaskStatus::ToDo),
    }
}

fn status_key(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Map the many ways a model spells a milestone status onto the closed set
pub fn normalize_milestone_status(text: &str) -> Option<MilestoneStatus> {
    match status_key(text).as_str() {
        "planned" | "planning" | "upcoming" | "scheduled" => Some(MilestoneStatus::Planned),
        "not started" | "pending" | "todo" | "to do" | "open" | "new" => {
            Some(MilestoneStatus::NotStarted)
        }
        "in progress" | "inprogress" | "ongoing" | "active" | "started" | "underway" => {
            Some(MilestoneStatus::InProgress)
        }
        "completed" | "complete" | "done" | "finished" | "achieved" => {
            Some(MilestoneStatus::Completed)
        }
        _ => None,
    }
}

pub fn normalize_task_status(text: &str) -> Option<TaskStatus> {
    match status_key(text).as_str() {
        "to do" | "todo" | "pending" | "not started" | "planned" | "open" | "new" => {
            Some(TaskStatus::ToDo)
        }
        "on hold" | "onhold" | "blocked" | "paused" | "waiting" => Some(TaskStatus::OnHold),
        "in progress" | "inprogress" | "ongoing" | "active" | "started" | "doing" => {
            Some(TaskStatus::InProgress)
        }
        "completed" | "complete" | "done" | "finished" => Some(TaskStatus::Completed),
        _ => None,
    }
}
