// Integration tests for the ingestion pipeline

use chrono::NaiveDate;
use venture_roadmap_lib::ai::LanguageModel;
use venture_roadmap_lib::config::SchedulingConfig;
use venture_roadmap_lib::database::{plans, projects, Database};
use venture_roadmap_lib::ingest::{resolve_roadmap, PlanRequest, RoadmapIngestor};
use venture_roadmap_lib::parsers::{parse_milestone_suggestions, KnownProgress};
use venture_roadmap_lib::scheduler::DateScheduler;
use venture_roadmap_lib::{IngestError, MilestoneStatus, RoadmapPlan, TaskStatus};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn resolve(text: &str, today: NaiveDate) -> RoadmapPlan {
    resolve_roadmap(text, &PlanRequest::new("user-1", "proj-1"), &DateScheduler::new(today)).plan
}

/// Everything but generated ids and timestamps
fn shape_of(plan: &RoadmapPlan) -> Vec<(String, NaiveDate, NaiveDate, Vec<(String, NaiveDate, NaiveDate)>)> {
    plan.milestones
        .iter()
        .map(|m| {
            (
                m.name.clone(),
                m.start_date,
                m.due_date,
                m.tasks
                    .iter()
                    .map(|t| (t.name.clone(), t.start_date, t.due_date))
                    .collect(),
            )
        })
        .collect()
}

const PHASE_ROADMAP: &str = "\
PHASE 1: Market Research
⏳ Duration: 2-3 weeks
• Survey 50 potential customers
• Analyze three competitors

PHASE 2: Product Development
⏳ Duration: 4 weeks
• Build the MVP
• Run a closed beta
";

const MARKDOWN_ROADMAP: &str = "\
# Food Truck Launch Plan

## Milestone 1: Licensing (2 weeks)
Get legal before buying anything.
1. Register the business
2. Apply for a mobile vendor permit

## Milestone 2: Equipment
| Task | Description | Start | Due | Priority |
|------|-------------|-------|-----|----------|
| Buy truck | Used, under budget | 2025-02-01 | 2025-02-10 | High |
| Fit kitchen | Fryer and fridge | 2025-02-11 | 2025-02-25 | Medium |

## Budget
- Truck: $25,000
- Kitchen fit-out: $8,000 (used equipment)
- Total: $35,000

## Weekly Calendar
Week 1: Register business
Week 2: Permits
Week 3: Truck shopping

## Risks
- Permit delays: apply early and follow up weekly

## Tips
- Start with a short menu
";

#[test]
fn test_phase_blocks_with_durations_and_bullets() {
    let plan = resolve(PHASE_ROADMAP, date(2025, 1, 1));

    assert_eq!(plan.milestones.len(), 2);
    let research = &plan.milestones[0];
    assert_eq!(research.name, "Market Research");
    assert_eq!(research.start_date, date(2025, 1, 1));
    assert_eq!(research.due_date, date(2025, 1, 15));
    assert_eq!(research.tasks.len(), 2);
    assert_eq!(research.tasks[0].name, "Survey 50 potential customers");

    let development = &plan.milestones[1];
    assert_eq!(development.start_date, date(2025, 1, 16));
    assert_eq!(development.due_date, date(2025, 2, 13));
}

#[test]
fn test_text_without_headers_gets_setup_milestone() {
    let plan = resolve(
        "You should think carefully about your market and then start small.",
        date(2025, 6, 1),
    );

    assert_eq!(plan.milestones.len(), 1);
    assert_eq!(plan.milestones[0].name, "Project Setup");
    let tasks: Vec<_> = plan.milestones[0].tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tasks, vec!["Define project scope", "Set up development environment"]);
    assert_eq!(plan.title, "Business Roadmap");
}

#[test]
fn test_pending_suggestion_with_full_progress_is_completed() {
    let known = KnownProgress::new().with_milestone("Market Research", 100);
    let text = r#"Here are my suggestions:
```json
[
  {"title": "Market Research", "status": "pending", "priority": "high"},
  {"title": "Launch Party", "status": "pending"}
]
```"#;

    let suggestions = parse_milestone_suggestions(text, &known).unwrap();
    assert_eq!(suggestions[0].status, MilestoneStatus::Completed);
    // Unknown milestones keep what the model said
    assert_ne!(suggestions[1].status, MilestoneStatus::Completed);
}

#[test]
fn test_table_task_with_two_dates() {
    let plan = resolve(MARKDOWN_ROADMAP, date(2025, 1, 1));

    let equipment = &plan.milestones[1];
    let truck = &equipment.tasks[0];
    assert_eq!(truck.name, "Buy truck");
    assert_eq!(truck.start_date, date(2025, 2, 1));
    assert_eq!(truck.due_date, date(2025, 2, 10));
    assert!(equipment.tasks.iter().all(|t| t.due_date >= t.start_date));
}

#[test]
fn test_full_markdown_plan_sections() {
    let plan = resolve(MARKDOWN_ROADMAP, date(2025, 1, 1));

    assert_eq!(plan.title, "Food Truck Launch Plan");
    assert_eq!(plan.budget, Some(35_000.0));
    assert_eq!(plan.budget_items.len(), 2);
    assert_eq!(plan.budget_items[1].notes, "used equipment");
    assert_eq!(plan.calendar_weeks.len(), 3);
    assert_eq!(plan.risks.len(), 1);
    assert_eq!(plan.tips[0].content, "Start with a short menu");
}

#[test]
fn test_never_empty() {
    for text in ["", "   ", "##", "```json\n{\"broken\": \n```", "| a | b |"] {
        let plan = resolve(text, date(2025, 1, 1));
        assert!(!plan.milestones.is_empty(), "no milestones for {:?}", text);
        assert!(
            plan.milestones.iter().all(|m| !m.tasks.is_empty()),
            "milestone without tasks for {:?}",
            text
        );
    }
}

#[test]
fn test_extreme_inputs_still_resolve() {
    let inputs = [
        "PHASE 1: Build\nDuration: 100000000 weeks\n- Code\nPHASE 2: Ship\n- Release",
        r#"[{"title":"Build","weeks":4000000000},{"title":"Ship"}]"#,
        "\u{17F}tage 1",
        "## Calendar\nWeek 4294967295: end\n- next",
    ];

    for text in inputs {
        let plan = resolve(text, date(2025, 1, 1));
        assert!(!plan.milestones.is_empty(), "no milestones for {:?}", text);
        for milestone in &plan.milestones {
            assert!(milestone.due_date >= milestone.start_date);
            assert!(milestone.tasks.iter().all(|t| t.due_date >= t.start_date));
        }
        for pair in plan.milestones.windows(2) {
            assert!(pair[1].start_date > pair[0].due_date);
        }
    }
}

#[test]
fn test_milestone_dates_are_monotonic() {
    let text = "\
## Phase 1: A (3 weeks)
- one
## Phase 2: B
Start date: 2024-01-01
- two
## Phase 3: C (1 week)
Due date: 2020-01-01
- three
";
    let plan = resolve(text, date(2025, 1, 1));

    for milestone in &plan.milestones {
        assert!(milestone.due_date >= milestone.start_date);
    }
    for pair in plan.milestones.windows(2) {
        assert!(pair[1].start_date > pair[0].due_date);
    }
}

#[test]
fn test_reparse_is_idempotent() {
    for text in [PHASE_ROADMAP, MARKDOWN_ROADMAP, "nothing here"] {
        let first = resolve(text, date(2025, 1, 1));
        let second = resolve(text, date(2025, 1, 1));
        assert_eq!(shape_of(&first), shape_of(&second));
        assert_eq!(first.budget_items, second.budget_items);
        assert_eq!(first.calendar_weeks, second.calendar_weeks);
    }
}

#[test]
fn test_json_roadmap_goes_through_scheduling() {
    let text = r#"```json
{
  "title": "Bakery",
  "milestones": [
    {"name": "Kitchen", "duration": "2 weeks", "tasks": ["Buy oven", {"title": "Get permit", "priority": "high"}]},
    {"name": "Open", "tasks": []}
  ],
  "tips": ["Bake early"]
}
```"#;
    let plan = resolve(text, date(2025, 3, 1));

    assert_eq!(plan.title, "Bakery");
    assert_eq!(plan.milestones[0].due_date, date(2025, 3, 15));
    assert_eq!(plan.milestones[1].start_date, date(2025, 3, 16));
    assert_eq!(plan.milestones[1].tasks[0].name, "Implement Open");
    assert_eq!(plan.milestones[0].tasks[0].status, TaskStatus::ToDo);
}

struct FakeModel {
    response: Result<String, String>,
}

impl LanguageModel for FakeModel {
    async fn complete(&self, _prompt: &str) -> Result<String, IngestError> {
        self.response.clone().map_err(IngestError::Transport)
    }
}

fn ingestor_with_project() -> (RoadmapIngestor<Database>, String) {
    let db = Database::in_memory().unwrap();
    db.init().unwrap();
    let project = projects::create_project(db.get_connection(), "Food Truck").unwrap();
    (RoadmapIngestor::new(db, SchedulingConfig::default()), project.id)
}

#[tokio::test]
async fn test_generate_commits_model_output() {
    let (mut ingestor, project_id) = ingestor_with_project();
    let model = FakeModel {
        response: Ok(MARKDOWN_ROADMAP.to_string()),
    };

    let outcome = ingestor
        .generate(&model, "A food truck", &PlanRequest::new("user-1", &project_id), date(2025, 1, 1))
        .await
        .unwrap();
    assert!(outcome.summary.contains("2 milestones and 4 tasks"));

    let conn = ingestor.store().get_connection();
    let stored = plans::get_plan(conn, &outcome.plan.id).unwrap();
    assert_eq!(stored.milestones.len(), 2);
    assert_eq!(plans::count_rows(conn, "tasks").unwrap(), 4);
}

#[tokio::test]
async fn test_transport_failure_commits_nothing() {
    let (mut ingestor, project_id) = ingestor_with_project();
    let model = FakeModel {
        response: Err("connection refused".to_string()),
    };

    let err = ingestor
        .generate(&model, "A food truck", &PlanRequest::new("user-1", &project_id), date(2025, 1, 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "transport");
    assert_eq!(
        plans::count_rows(ingestor.store().get_connection(), "roadmap_plans").unwrap(),
        0
    );
}

#[test]
fn test_suggestions_use_stored_progress() {
    let (mut ingestor, project_id) = ingestor_with_project();
    let outcome = ingestor
        .ingest(PHASE_ROADMAP, &PlanRequest::new("user-1", &project_id), date(2025, 1, 1))
        .unwrap();

    let milestone_id = outcome.plan.milestones[0].id.clone();
    plans::set_milestone_progress(ingestor.store().get_connection(), &milestone_id, 100).unwrap();

    let suggestions = ingestor
        .milestone_suggestions(
            r#"[{"title": "market research", "status": "not started"}]"#,
            &project_id,
        )
        .unwrap();
    assert_eq!(suggestions[0].status, MilestoneStatus::Completed);
}
