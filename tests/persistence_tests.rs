// Integration tests for committing resolved roadmaps to SQLite

use chrono::NaiveDate;
use tempfile::TempDir;
use venture_roadmap_lib::database::{plans, projects, Database, PlanStore};
use venture_roadmap_lib::ingest::{resolve_roadmap, PlanRequest};
use venture_roadmap_lib::scheduler::DateScheduler;
use venture_roadmap_lib::{ProjectStatus, RoadmapPlan};

const ROADMAP: &str = "\
# Mobile Coffee Cart

## Milestone 1: Permits (2 weeks)
1. Apply for vendor license
2. Book health inspection

## Milestone 2: Launch (1 week)
- Pick a location
- Open on Saturday

## Budget
- Cart: $4,000
- Coffee machine: $1,500

## Weekly Calendar
Week 1: Paperwork
Week 2: Inspection
Week 3: Launch

## Risks
- Rain: bring a canopy

## Tips
- Keep the menu short
";

fn setup(db: &Database) -> String {
    db.init().unwrap();
    projects::create_project(db.get_connection(), "Coffee Cart")
        .unwrap()
        .id
}

fn resolved(project_id: &str) -> RoadmapPlan {
    let scheduler = DateScheduler::new(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
    resolve_roadmap(ROADMAP, &PlanRequest::new("user-1", project_id), &scheduler).plan
}

#[test]
fn test_commit_writes_full_graph() {
    let mut db = Database::in_memory().unwrap();
    let project_id = setup(&db);
    let plan = resolved(&project_id);

    db.commit_roadmap(&plan).unwrap();

    let conn = db.get_connection();
    assert_eq!(plans::count_rows(conn, "roadmap_plans").unwrap(), 1);
    assert_eq!(plans::count_rows(conn, "milestones").unwrap(), 2);
    assert_eq!(plans::count_rows(conn, "tasks").unwrap(), 4);
    assert_eq!(plans::count_rows(conn, "budget_items").unwrap(), 2);
    assert_eq!(plans::count_rows(conn, "calendar_weeks").unwrap(), 3);
    assert_eq!(plans::count_rows(conn, "risks").unwrap(), 1);
    assert_eq!(plans::count_rows(conn, "tips").unwrap(), 1);

    let stored = plans::get_plan(conn, &plan.id).unwrap();
    assert_eq!(stored.title, "Mobile Coffee Cart");
    assert_eq!(stored.budget, Some(5500.0));
    assert_eq!(stored.milestones, plan.milestones);
    assert_eq!(
        projects::get_project_status(conn, &project_id).unwrap(),
        Some(ProjectStatus::InProgress)
    );
}

#[test]
fn test_failed_commit_is_atomic() {
    let mut db = Database::in_memory().unwrap();
    let project_id = setup(&db);
    let mut plan = resolved(&project_id);

    // Collide with a task id that is inserted earlier in the same commit
    let first_id = plan.milestones[0].tasks[0].id.clone();
    let last = plan.milestones.len() - 1;
    plan.milestones[last].tasks[0].id = first_id;

    let err = db.commit_roadmap(&plan).unwrap_err();
    assert_eq!(err.kind(), "persistence");
    assert!(err.is_retryable());

    let conn = db.get_connection();
    for table in [
        "roadmap_plans",
        "milestones",
        "tasks",
        "budget_items",
        "calendar_weeks",
        "risks",
        "tips",
    ] {
        assert_eq!(plans::count_rows(conn, table).unwrap(), 0, "{} not rolled back", table);
    }
    assert_eq!(
        projects::get_project_status(conn, &project_id).unwrap(),
        Some(ProjectStatus::Planning)
    );
}

#[test]
fn test_missing_project_rolls_back() {
    let mut db = Database::in_memory().unwrap();
    db.init().unwrap();
    let plan = resolved("proj_missing");

    let err = db.commit_roadmap(&plan).unwrap_err();
    assert_eq!(err.kind(), "persistence");
    assert_eq!(plans::count_rows(db.get_connection(), "milestones").unwrap(), 0);
}

#[test]
fn test_retry_after_failure_succeeds() {
    let mut db = Database::in_memory().unwrap();
    let project_id = setup(&db);
    let good = resolved(&project_id);

    let mut bad = good.clone();
    bad.milestones[1].tasks[0].id = bad.milestones[0].tasks[0].id.clone();
    assert!(db.commit_roadmap(&bad).is_err());

    db.commit_roadmap(&good).unwrap();
    assert_eq!(plans::count_rows(db.get_connection(), "tasks").unwrap(), 4);
}

#[test]
fn test_on_disk_database_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("roadmap.db");

    let plan_id = {
        let mut db = Database::new(&path).unwrap();
        let project_id = setup(&db);
        let plan = resolved(&project_id);
        db.commit_roadmap(&plan).unwrap();
        plan.id
    };

    let db = Database::new(&path).unwrap();
    db.init().unwrap();
    let stored = plans::get_plan(db.get_connection(), &plan_id).unwrap();
    assert_eq!(stored.milestones.len(), 2);
    assert_eq!(stored.calendar_weeks[2].summary, "Launch");
}

#[test]
fn test_known_progress_reflects_stored_rows() {
    let mut db = Database::in_memory().unwrap();
    let project_id = setup(&db);
    let plan = resolved(&project_id);
    db.commit_roadmap(&plan).unwrap();

    plans::set_milestone_progress(db.get_connection(), &plan.milestones[1].id, 50).unwrap();
    let known = db.known_progress(&project_id).unwrap();

    use venture_roadmap_lib::parsers::ProgressLookup;
    assert_eq!(known.milestone_progress("Launch"), Some(50));
    assert_eq!(known.milestone_progress("Permits"), Some(0));
    assert_eq!(known.task_progress("Pick a location"), Some(0));
}
