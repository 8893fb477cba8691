// Document-level roadmap parsing
//
// Strategies run in order: embedded JSON roadmap, then header-delimited
// sections. When neither recognizes anything the draft falls back to the
// default setup milestone, so the result is never empty.

use super::embedded_json::try_extract_json_value;
use super::fields::{clean_heading, leading_paragraph, strip_field_lines, BlockFields};
use super::json_roadmap::roadmap_from_json;
use super::plan_sections::{extract_budget, extract_calendar, extract_risks, extract_tips};
use super::segmenter::{segment, Section, SectionKind};
use super::tasks::parse_tasks;
use crate::models::{MilestoneDraft, RoadmapDraft, RoadmapShape, TaskDraft};

pub const DEFAULT_MILESTONE_NAME: &str = "Project Setup";
pub const DEFAULT_MILESTONE_DESCRIPTION: &str = "Initial project setup and planning";
pub const DEFAULT_TASKS: &[(&str, &str)] = &[
    (
        "Define project scope",
        "Outline goals, deliverables and constraints for the project",
    ),
    (
        "Set up development environment",
        "Prepare the tools, accounts and workspace needed to start",
    ),
];

type RoadmapStrategy = fn(&str) -> Option<RoadmapDraft>;

const ROADMAP_STRATEGIES: &[(RoadmapShape, RoadmapStrategy)] = &[
    (RoadmapShape::Json, json_strategy),
    (RoadmapShape::Sections, sections_strategy),
];

fn json_strategy(text: &str) -> Option<RoadmapDraft> {
    let value = try_extract_json_value(text)?;
    roadmap_from_json(&value)
}

fn milestone_from_section(section: &Section) -> MilestoneDraft {
    let (name, heading_duration) = clean_heading(&section.label);
    let fields = BlockFields::from_block(&section.body);
    let block = strip_field_lines(&section.body);
    let parsed = parse_tasks(&block);

    // A first line that is really the first task is not a description
    let description = fields.description.clone().or_else(|| {
        leading_paragraph(&block).filter(|paragraph| {
            parsed
                .tasks
                .first()
                .map_or(true, |task| !paragraph.contains(&task.name))
        })
    });

    MilestoneDraft {
        name,
        description: description.unwrap_or_default(),
        status: fields.status,
        priority: fields.priority,
        start: fields.start,
        due: fields.due,
        duration: fields.duration.or(heading_duration),
        tasks: parsed.tasks,
        task_pattern: parsed.pattern,
    }
}

fn sections_strategy(text: &str) -> Option<RoadmapDraft> {
    let segmentation = segment(text);
    if !segmentation.is_structured() {
        return None;
    }

    let mut draft = RoadmapDraft::empty(RoadmapShape::Sections);
    draft.title = segmentation
        .of_kind(SectionKind::Title)
        .next()
        .map(|s| s.label.clone());
    draft.milestones = segmentation.milestones().map(milestone_from_section).collect();

    for section in segmentation.of_kind(SectionKind::Budget) {
        let budget = extract_budget(&section.body);
        draft.budget_items.extend(budget.items);
        draft.budget_total = draft.budget_total.or(budget.total);
    }
    for section in segmentation.of_kind(SectionKind::Calendar) {
        // Week numbers keep increasing across calendar sections
        let last = draft.calendar_weeks.last().map_or(0, |w| w.week_number);
        draft.calendar_weeks.extend(
            extract_calendar(&section.body)
                .into_iter()
                .filter(|w| w.week_number > last),
        );
    }
    for section in segmentation.of_kind(SectionKind::Risks) {
        draft.risks.extend(extract_risks(&section.body));
    }
    for section in segmentation.of_kind(SectionKind::Tips) {
        draft.tips.extend(extract_tips(&section.body));
    }

    if draft.milestones.is_empty() {
        log::info!("Structured response had no milestone sections; using default milestone");
        draft.milestones.push(default_milestone(""));
    }
    Some(draft)
}

/// The setup milestone used when nothing milestone-shaped was found. Tasks
/// still come from the text when it holds a recognizable list.
pub fn default_milestone(text: &str) -> MilestoneDraft {
    let parsed = parse_tasks(&strip_field_lines(text));
    let (tasks, task_pattern) = if parsed.tasks.is_empty() {
        let tasks = DEFAULT_TASKS
            .iter()
            .map(|(name, description)| TaskDraft::new(*name, *description))
            .collect();
        (tasks, None)
    } else {
        (parsed.tasks, parsed.pattern)
    };

    MilestoneDraft {
        name: DEFAULT_MILESTONE_NAME.to_string(),
        description: DEFAULT_MILESTONE_DESCRIPTION.to_string(),
        tasks,
        task_pattern,
        ..Default::default()
    }
}

/// Parse a full roadmap response. Always yields at least one milestone.
pub fn parse_roadmap_text(text: &str) -> RoadmapDraft {
    for (shape, strategy) in ROADMAP_STRATEGIES {
        if let Some(draft) = strategy(text) {
            log::debug!(
                "Parsed roadmap as {:?}: {} milestones",
                shape,
                draft.milestones.len()
            );
            return draft;
        }
    }

    log::info!("No structure recognized in model response; using default milestone");
    let mut draft = RoadmapDraft::empty(RoadmapShape::Unstructured);
    draft.milestones.push(default_milestone(text));
    draft
}

/// Parse a response describing one milestone. The first milestone section
/// wins; unstructured text becomes a milestone named `fallback_name`.
pub fn parse_milestone_text(text: &str, fallback_name: &str) -> MilestoneDraft {
    if let Some(draft) = try_extract_json_value(text).and_then(|value| roadmap_from_json(&value)) {
        if let Some(first) = draft.milestones.into_iter().next() {
            return first;
        }
    }

    let segmentation = segment(text);
    if let Some(section) = segmentation.milestones().next() {
        return milestone_from_section(section);
    }

    let body = segmentation
        .sections
        .iter()
        .map(|s| s.body.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let section = Section {
        label: fallback_name.to_string(),
        kind: SectionKind::Milestone,
        style: None,
        ordinal: None,
        body,
    };
    milestone_from_section(&section)
}
