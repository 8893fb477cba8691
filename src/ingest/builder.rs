// Resolve parser drafts into dated, identified entities

use crate::models::status::resolve_milestone_status;
use crate::models::{
    Milestone, MilestoneDraft, RoadmapDraft, RoadmapPlan, RoadmapShape, Task, TaskDraft,
    TaskPattern, TaskStatus,
};
use crate::parsers::tasks::{candidate_dates, default_task};
use crate::scheduler::{DateScheduler, DateSpan, DeclaredDates};
use chrono::Utc;
use uuid::Uuid;

pub const DEFAULT_PLAN_TITLE: &str = "Business Roadmap";

/// Who a roadmap belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub user_id: String,
    pub project_id: String,
    /// Title supplied with the request, used when the text has none
    pub title: Option<String>,
}

impl PlanRequest {
    pub fn new(user_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            project_id: project_id.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn build_tasks(
    milestone_id: &str,
    milestone_name: &str,
    drafts: Vec<TaskDraft>,
    span: DateSpan,
    scheduler: &DateScheduler,
) -> Vec<Task> {
    let drafts = if drafts.is_empty() {
        log::debug!("Milestone '{}' had no tasks; adding default task", milestone_name);
        vec![default_task(milestone_name)]
    } else {
        drafts
    };

    let dates = candidate_dates(
        &drafts,
        span.start,
        span.due,
        scheduler.task_offset_days(),
        scheduler.task_duration_days(),
    );

    drafts
        .into_iter()
        .zip(dates)
        .map(|(draft, (start, due))| {
            let range = scheduler.repair_task_range(start, due);
            Task {
                id: new_id(),
                milestone_id: milestone_id.to_string(),
                name: draft.name,
                description: draft.description,
                status: draft.status.unwrap_or(TaskStatus::ToDo),
                priority: draft.priority.unwrap_or_default(),
                start_date: range.start,
                due_date: range.due,
                estimated_duration: draft.estimated_duration,
                progress: 0,
            }
        })
        .collect()
}

/// Turn one milestone draft into a milestone on an already scheduled span
pub fn build_milestone(draft: MilestoneDraft, span: DateSpan, scheduler: &DateScheduler) -> Milestone {
    let id = new_id();
    let tasks = build_tasks(&id, &draft.name, draft.tasks, span, scheduler);

    Milestone {
        id,
        // Nothing is known about progress at ingestion time
        status: resolve_milestone_status(None, draft.status).value,
        priority: draft.priority.unwrap_or_default(),
        name: draft.name,
        description: draft.description,
        start_date: span.start,
        due_date: span.due,
        progress: 0,
        ai_generated: true,
        tasks,
    }
}

fn declared(draft: &MilestoneDraft) -> DeclaredDates<'_> {
    DeclaredDates {
        start: draft.start,
        due: draft.due,
        duration: draft.duration.as_deref(),
    }
}

/// Schedule and identify every entity of a draft
pub fn build_plan(draft: RoadmapDraft, request: &PlanRequest, scheduler: &DateScheduler) -> RoadmapPlan {
    let spans = scheduler.chain(draft.milestones.iter().map(declared));

    let milestones: Vec<Milestone> = draft
        .milestones
        .into_iter()
        .zip(spans)
        .map(|(milestone, span)| build_milestone(milestone, span, scheduler))
        .collect();

    let title = draft
        .title
        .filter(|t| !t.trim().is_empty())
        .or_else(|| request.title.clone().filter(|t| !t.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_PLAN_TITLE.to_string());

    let budget = draft.budget_total.or_else(|| {
        if draft.budget_items.is_empty() {
            None
        } else {
            Some(draft.budget_items.iter().map(|item| item.suggested_cost).sum())
        }
    });

    RoadmapPlan {
        id: new_id(),
        user_id: request.user_id.clone(),
        project_id: request.project_id.clone(),
        title,
        budget,
        created_at: Utc::now(),
        milestones,
        budget_items: draft.budget_items,
        calendar_weeks: draft.calendar_weeks,
        risks: draft.risks,
        tips: draft.tips,
    }
}

/// Human-readable account of a run, for the caller and the log
pub fn summarize(plan: &RoadmapPlan, shape: RoadmapShape, patterns: &[Option<TaskPattern>]) -> String {
    let mut summary = format!(
        "Created roadmap '{}' with {} milestones and {} tasks",
        plan.title,
        plan.milestones.len(),
        plan.task_count()
    );

    let extras: Vec<String> = [
        (plan.budget_items.len(), "budget items"),
        (plan.calendar_weeks.len(), "calendar weeks"),
        (plan.risks.len(), "risks"),
        (plan.tips.len(), "tips"),
    ]
    .iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, label)| format!("{} {}", count, label))
    .collect();
    if !extras.is_empty() {
        summary.push_str(&format!(" ({})", extras.join(", ")));
    }
    summary.push('.');

    if shape == RoadmapShape::Unstructured {
        summary.push_str(" No roadmap structure was recognized, so the default setup milestone was used.");
    }

    let mut used: Vec<&str> = Vec::new();
    for pattern in patterns.iter().flatten() {
        if !used.contains(&pattern.as_str()) {
            used.push(pattern.as_str());
        }
    }
    if !used.is_empty() {
        summary.push_str(&format!(" Tasks read from: {}.", used.join(", ")));
    }

    let synthesized = patterns.iter().filter(|p| p.is_none()).count();
    if synthesized > 0 {
        summary.push_str(&format!(
            " {} milestone(s) had no task list and received default tasks.",
            synthesized
        ));
    }

    if let Some(budget) = plan.budget {
        summary.push_str(&format!(" Budget: {:.2}.", budget));
    }
    summary
}
