// JSON roadmap strategy
//
// A roadmap returned as JSON is read field by field with key aliases and
// explicit defaults. JSON that does not look like a roadmap yields None so
// the text extractors can take over.

use super::text::{first_integer, parse_amount, parse_iso_date, plain_text, split_title_description};
use crate::models::status::{normalize_milestone_status, normalize_task_status};
use crate::models::{
    BudgetItem, CalendarWeek, MilestoneDraft, Priority, Risk, RoadmapDraft, RoadmapShape,
    TaskDraft, TaskPattern, Tip,
};
use serde_json::Value;

const TITLE_KEYS: &[&str] = &["title", "name", "milestone", "phase", "task"];
const DESCRIPTION_KEYS: &[&str] = &["description", "summary", "objective", "details", "goal"];
const START_KEYS: &[&str] = &["startDate", "start_date", "start", "startsOn"];
const DUE_KEYS: &[&str] = &["dueDate", "due_date", "endDate", "end_date", "deadline", "due"];
const DURATION_KEYS: &[&str] = &[
    "duration",
    "estimatedDuration",
    "estimated_duration",
    "timeline",
    "timeframe",
];
const TASK_LIST_KEYS: &[&str] = &["tasks", "steps", "actions", "actionItems", "action_items"];
const MILESTONE_LIST_KEYS: &[&str] = &["milestones", "phases", "roadmap", "stages"];

/// First present, non-null value among the aliases
pub(crate) fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find(|v| !v.is_null())
}

/// String field, trimmed; numbers are rendered as text
pub(crate) fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    let text = match field(value, keys)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub(crate) fn number_field(value: &Value, keys: &[&str]) -> Option<f64> {
    match field(value, keys)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s).or_else(|| s.trim().replace(',', "").parse().ok()),
        _ => None,
    }
}

fn priority_field(value: &Value) -> Option<Priority> {
    str_field(value, &["priority", "importance"]).and_then(|p| Priority::parse_loose(&p))
}

fn task_from_value(value: &Value) -> Option<TaskDraft> {
    if let Some(text) = value.as_str() {
        let (name, description) = split_title_description(text);
        return (!name.is_empty()).then(|| TaskDraft::new(name, description));
    }

    let name = plain_text(&str_field(value, TITLE_KEYS)?);
    Some(TaskDraft {
        name,
        description: str_field(value, DESCRIPTION_KEYS).unwrap_or_default(),
        status: str_field(value, &["status"]).and_then(|s| normalize_task_status(&s)),
        priority: priority_field(value),
        start: str_field(value, START_KEYS).and_then(|s| parse_iso_date(&s)),
        due: str_field(value, DUE_KEYS).and_then(|s| parse_iso_date(&s)),
        estimated_duration: str_field(value, DURATION_KEYS),
    })
}

fn milestone_from_value(value: &Value) -> Option<MilestoneDraft> {
    if !value.is_object() {
        return None;
    }
    let name = plain_text(&str_field(value, TITLE_KEYS)?);

    let tasks: Vec<TaskDraft> = field(value, TASK_LIST_KEYS)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(task_from_value).collect())
        .unwrap_or_default();

    // A bare number of weeks is a duration
    let duration = str_field(value, DURATION_KEYS).or_else(|| {
        number_field(value, &["weeks", "durationWeeks", "duration_weeks"])
            .map(|w| format!("{} weeks", w.round() as i64))
    });

    Some(MilestoneDraft {
        name,
        description: str_field(value, DESCRIPTION_KEYS).unwrap_or_default(),
        status: str_field(value, &["status"]).and_then(|s| normalize_milestone_status(&s)),
        priority: priority_field(value),
        start: str_field(value, START_KEYS).and_then(|s| parse_iso_date(&s)),
        due: str_field(value, DUE_KEYS).and_then(|s| parse_iso_date(&s)),
        duration,
        task_pattern: (!tasks.is_empty()).then_some(TaskPattern::Json),
        tasks,
    })
}

fn budget_item_from_value(value: &Value) -> Option<BudgetItem> {
    let name = str_field(value, &["name", "item", "category", "title", "expense"])?;
    let cost = number_field(
        value,
        &["suggestedCost", "suggested_cost", "estimatedCost", "estimated_cost", "cost", "amount"],
    )?;
    Some(BudgetItem {
        name,
        suggested_cost: cost,
        actual_cost: None,
        notes: str_field(value, &["notes", "note", "description", "details"]).unwrap_or_default(),
    })
}

/// Budget can be a bare total, a list of items, or an object holding both
fn budget_from_value(value: &Value) -> (Vec<BudgetItem>, Option<f64>) {
    match value {
        Value::Number(n) => (Vec::new(), n.as_f64()),
        Value::String(s) => (Vec::new(), parse_amount(s)),
        Value::Array(items) => (items.iter().filter_map(budget_item_from_value).collect(), None),
        Value::Object(_) => {
            let items = field(value, &["items", "breakdown", "lineItems", "line_items"])
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(budget_item_from_value).collect())
                .unwrap_or_default();
            (items, number_field(value, &["total", "totalBudget", "total_budget", "amount"]))
        }
        _ => (Vec::new(), None),
    }
}

fn calendar_from_value(value: &Value) -> Vec<CalendarWeek> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .fold(Vec::<CalendarWeek>::new(), |mut weeks, entry| {
            let previous = weeks.last().map_or(0, |w| w.week_number);
            let next = previous.checked_add(1);
            let (number, summary) = match entry {
                Value::String(s) => (next, plain_text(s)),
                _ => {
                    let number = str_field(entry, &["week", "weekNumber", "week_number"])
                        .and_then(|w| first_integer(&w))
                        .or(next);
                    let summary = str_field(entry, &["summary", "focus", "description", "tasks"])
                        .unwrap_or_default();
                    (number, summary)
                }
            };
            if let Some(number) = number.filter(|n| *n > previous) {
                weeks.push(CalendarWeek {
                    week_number: number,
                    summary,
                });
            }
            weeks
        })
}

fn risk_from_value(value: &Value) -> Option<Risk> {
    if let Some(text) = value.as_str() {
        let (risk, mitigation) = split_title_description(text);
        return (!risk.is_empty()).then_some(Risk { risk, mitigation });
    }
    Some(Risk {
        risk: str_field(value, &["risk", "title", "name", "description"])?,
        mitigation: str_field(value, &["mitigation", "solution", "response"]).unwrap_or_default(),
    })
}

fn tip_from_value(value: &Value) -> Option<Tip> {
    let content = match value {
        Value::String(s) => plain_text(s),
        _ => str_field(value, &["content", "tip", "text"])?,
    };
    (!content.is_empty()).then_some(Tip { content })
}

fn list<T>(value: &Value, keys: &[&str], item: fn(&Value) -> Option<T>) -> Vec<T> {
    field(value, keys)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(item).collect())
        .unwrap_or_default()
}

/// Read a roadmap from parsed JSON: an array of milestones, or an object
/// holding `milestones` next to budget, calendar, risks and tips
pub fn roadmap_from_json(value: &Value) -> Option<RoadmapDraft> {
    let (milestone_values, root) = match value {
        Value::Array(items) => (items.as_slice(), None),
        Value::Object(_) => (
            field(value, MILESTONE_LIST_KEYS)?.as_array()?.as_slice(),
            Some(value),
        ),
        _ => return None,
    };

    let milestones: Vec<MilestoneDraft> =
        milestone_values.iter().filter_map(milestone_from_value).collect();
    if milestones.is_empty() {
        log::info!("JSON in response does not describe a roadmap");
        return None;
    }

    let mut draft = RoadmapDraft::empty(RoadmapShape::Json);
    draft.milestones = milestones;

    if let Some(root) = root {
        draft.title = str_field(root, &["title", "planTitle", "plan_title", "name"]);
        if let Some(budget) = field(root, &["budget", "budgetItems", "budget_items"]) {
            let (items, total) = budget_from_value(budget);
            draft.budget_items = items;
            draft.budget_total = total;
        }
        draft.budget_total = draft
            .budget_total
            .or_else(|| number_field(root, &["totalBudget", "total_budget"]));
        if let Some(calendar) = field(root, &["calendar", "weeklyCalendar", "weekly_calendar", "weeks"]) {
            draft.calendar_weeks = calendar_from_value(calendar);
        }
        draft.risks = list(root, &["risks", "challenges"], risk_from_value);
        draft.tips = list(root, &["tips", "recommendations", "advice"], tip_from_value);
    }

    log::debug!(
        "Read JSON roadmap with {} milestones",
        draft.milestones.len()
    );
    Some(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_array_of_milestones_with_aliases() {
        let value = json!([
            {
                "name": "Validate",
                "summary": "Talk to customers",
                "start_date": "2025-01-06",
                "endDate": "2025-01-20",
                "priority": "HIGH",
                "tasks": ["Interview 10 users: cafe owners", {"title": "Summarize", "due_date": "2025-01-19"}]
            },
            {"title": "Build", "duration": "3 weeks"}
        ]);

        let draft = roadmap_from_json(&value).unwrap();
        assert_eq!(draft.shape, RoadmapShape::Json);
        assert_eq!(draft.milestones.len(), 2);

        let first = &draft.milestones[0];
        assert_eq!(first.name, "Validate");
        assert_eq!(first.description, "Talk to customers");
        assert_eq!(first.start, NaiveDate::from_ymd_opt(2025, 1, 6));
        assert_eq!(first.due, NaiveDate::from_ymd_opt(2025, 1, 20));
        assert_eq!(first.priority, Some(Priority::High));
        assert_eq!(first.task_pattern, Some(TaskPattern::Json));
        assert_eq!(first.tasks[0].name, "Interview 10 users");
        assert_eq!(first.tasks[0].description, "cafe owners");
        assert_eq!(first.tasks[1].due, NaiveDate::from_ymd_opt(2025, 1, 19));

        let second = &draft.milestones[1];
        assert_eq!(second.duration.as_deref(), Some("3 weeks"));
        assert!(second.tasks.is_empty());
        assert_eq!(second.task_pattern, None);
    }

    #[test]
    fn test_full_plan_object() {
        let value = json!({
            "title": "Food Truck Plan",
            "milestones": [{"title": "Permits", "weeks": 2}],
            "budget": {"total": "$12,000", "items": [{"item": "Truck", "cost": 9000}, {"name": "Permits", "amount": "$450", "notes": "city"}]},
            "calendar": [{"week": 1, "focus": "Paperwork"}, {"week": 1, "focus": "dup"}, "Buy truck"],
            "risks": [{"risk": "Rain", "mitigation": "Canopy"}, "Permits delayed: apply early"],
            "tips": ["Start small", {"content": "Track costs"}]
        });

        let draft = roadmap_from_json(&value).unwrap();
        assert_eq!(draft.title.as_deref(), Some("Food Truck Plan"));
        assert_eq!(draft.milestones[0].duration.as_deref(), Some("2 weeks"));
        assert_eq!(draft.budget_total, Some(12000.0));
        assert_eq!(draft.budget_items.len(), 2);
        assert_eq!(draft.budget_items[0].suggested_cost, 9000.0);
        assert_eq!(draft.budget_items[1].suggested_cost, 450.0);
        assert_eq!(draft.budget_items[1].notes, "city");

        let weeks: Vec<_> = draft.calendar_weeks.iter().map(|w| w.week_number).collect();
        assert_eq!(weeks, vec![1, 2]);
        assert_eq!(draft.calendar_weeks[1].summary, "Buy truck");

        assert_eq!(draft.risks[1].risk, "Permits delayed");
        assert_eq!(draft.risks[1].mitigation, "apply early");
        assert_eq!(draft.tips.len(), 2);
    }

    #[test]
    fn test_calendar_after_last_week_number_is_dropped() {
        let value = json!({
            "milestones": [{"title": "Build"}],
            "calendar": [{"week": 4294967295u32, "focus": "end"}, "next", {"focus": "later"}]
        });

        let draft = roadmap_from_json(&value).unwrap();
        let weeks: Vec<_> = draft.calendar_weeks.iter().map(|w| w.week_number).collect();
        assert_eq!(weeks, vec![u32::MAX]);
    }

    #[test]
    fn test_non_roadmap_json_is_rejected() {
        assert!(roadmap_from_json(&json!({"answer": 42})).is_none());
        assert!(roadmap_from_json(&json!([1, 2, 3])).is_none());
        assert!(roadmap_from_json(&json!("text")).is_none());
    }
}
