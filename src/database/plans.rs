// Roadmap plan database operations
//
// Writes go through one IMMEDIATE transaction per commit so a failed insert
// leaves nothing behind.

use super::projects::update_project_status;
use super::transactions::execute_in_transaction;
use crate::error::IngestError;
use crate::models::{
    BudgetItem, CalendarWeek, Milestone, ProjectStatus, Risk, RoadmapPlan, Task, Tip,
};
use crate::parsers::suggestions::KnownProgress;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Result, Row, TransactionBehavior};

/// Tables `count_rows` may be asked about
const COUNTABLE_TABLES: &[&str] = &[
    "projects",
    "roadmap_plans",
    "milestones",
    "tasks",
    "budget_items",
    "calendar_weeks",
    "risks",
    "tips",
];

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn date_column(row: &Row<'_>, idx: usize) -> Result<NaiveDate> {
    let value: String = row.get(idx)?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map_err(|e| conversion_error(idx, format!("Invalid date '{}': {}", value, e)))
}

fn parsed_column<T>(row: &Row<'_>, idx: usize) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let value: String = row.get(idx)?;
    value.parse().map_err(|e| conversion_error(idx, e))
}

fn progress_column(row: &Row<'_>, idx: usize) -> Result<u8> {
    let value: i64 = row.get(idx)?;
    Ok(value.clamp(0, 100) as u8)
}

fn insert_plan_row(conn: &Connection, plan: &RoadmapPlan) -> Result<()> {
    conn.execute(
        "INSERT INTO roadmap_plans (id, user_id, project_id, title, budget, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            plan.id,
            plan.user_id,
            plan.project_id,
            plan.title,
            plan.budget,
            plan.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn insert_task(conn: &Connection, position: usize, task: &Task) -> Result<()> {
    conn.execute(
        "INSERT INTO tasks (
            id, milestone_id, position, name, description, status, priority,
            start_date, due_date, estimated_duration, progress
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            task.id,
            task.milestone_id,
            position as i64,
            task.name,
            task.description,
            task.status.as_str(),
            task.priority.as_str(),
            task.start_date.to_string(),
            task.due_date.to_string(),
            task.estimated_duration,
            task.progress,
        ],
    )?;
    Ok(())
}

/// Insert a milestone and its tasks; returns the number of tasks written
fn insert_milestone(
    conn: &Connection,
    plan_id: &str,
    position: usize,
    milestone: &Milestone,
) -> Result<usize> {
    conn.execute(
        "INSERT INTO milestones (
            id, plan_id, position, name, description, status, priority,
            start_date, due_date, progress, ai_generated
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            milestone.id,
            plan_id,
            position as i64,
            milestone.name,
            milestone.description,
            milestone.status.as_str(),
            milestone.priority.as_str(),
            milestone.start_date.to_string(),
            milestone.due_date.to_string(),
            milestone.progress,
            milestone.ai_generated,
        ],
    )?;

    for (i, task) in milestone.tasks.iter().enumerate() {
        insert_task(conn, i, task)?;
    }
    Ok(milestone.tasks.len())
}

fn insert_plan_children(conn: &Connection, plan: &RoadmapPlan) -> Result<()> {
    for (i, item) in plan.budget_items.iter().enumerate() {
        conn.execute(
            "INSERT INTO budget_items (plan_id, position, name, suggested_cost, actual_cost, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![plan.id, i as i64, item.name, item.suggested_cost, item.actual_cost, item.notes],
        )?;
    }

    for week in &plan.calendar_weeks {
        conn.execute(
            "INSERT INTO calendar_weeks (plan_id, week_number, summary) VALUES (?1, ?2, ?3)",
            params![plan.id, week.week_number, week.summary],
        )?;
    }

    for (i, risk) in plan.risks.iter().enumerate() {
        conn.execute(
            "INSERT INTO risks (plan_id, position, risk, mitigation) VALUES (?1, ?2, ?3, ?4)",
            params![plan.id, i as i64, risk.risk, risk.mitigation],
        )?;
    }

    for (i, tip) in plan.tips.iter().enumerate() {
        conn.execute(
            "INSERT INTO tips (plan_id, position, content) VALUES (?1, ?2, ?3)",
            params![plan.id, i as i64, tip.content],
        )?;
    }

    Ok(())
}

/// Write the whole plan graph and move the project to `in progress`, all in
/// one transaction
pub fn commit_roadmap(conn: &mut Connection, plan: &RoadmapPlan) -> std::result::Result<(), IngestError> {
    let task_count = execute_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
        insert_plan_row(tx, plan)?;

        let mut tasks = 0;
        for (i, milestone) in plan.milestones.iter().enumerate() {
            tasks += insert_milestone(tx, &plan.id, i, milestone)?;
        }
        insert_plan_children(tx, plan)?;

        update_project_status(tx, &plan.project_id, ProjectStatus::InProgress)?;
        Ok(tasks)
    })
    .map_err(|e| {
        log::error!("Roadmap commit for plan {} rolled back: {}", plan.id, e);
        IngestError::Persistence(e)
    })?;

    log::info!(
        "Committed plan {}: {} milestones, {} tasks, {} budget items, {} weeks, {} risks, {} tips",
        plan.id,
        plan.milestones.len(),
        task_count,
        plan.budget_items.len(),
        plan.calendar_weeks.len(),
        plan.risks.len(),
        plan.tips.len()
    );
    Ok(())
}

/// Append one milestone with its tasks to an existing plan and move the
/// project to `in progress`
pub fn commit_milestone(
    conn: &mut Connection,
    plan_id: &str,
    project_id: &str,
    milestone: &Milestone,
) -> std::result::Result<(), IngestError> {
    let task_count = execute_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
        let position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM milestones WHERE plan_id = ?1",
            params![plan_id],
            |row| row.get(0),
        )?;
        let tasks = insert_milestone(tx, plan_id, position as usize, milestone)?;
        update_project_status(tx, project_id, ProjectStatus::InProgress)?;
        Ok(tasks)
    })
    .map_err(|e| {
        log::error!("Milestone commit for plan {} rolled back: {}", plan_id, e);
        IngestError::Persistence(e)
    })?;

    log::info!(
        "Committed milestone '{}' with {} tasks to plan {}",
        milestone.name,
        task_count,
        plan_id
    );
    Ok(())
}

pub fn get_tasks_for_milestone(conn: &Connection, milestone_id: &str) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(
        "SELECT id, milestone_id, name, description, status, priority,
                start_date, due_date, estimated_duration, progress
         FROM tasks WHERE milestone_id = ?1 ORDER BY position",
    )?;

    let tasks = stmt.query_map(params![milestone_id], |row| {
        Ok(Task {
            id: row.get(0)?,
            milestone_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            status: parsed_column(row, 4)?,
            priority: parsed_column(row, 5)?,
            start_date: date_column(row, 6)?,
            due_date: date_column(row, 7)?,
            estimated_duration: row.get(8)?,
            progress: progress_column(row, 9)?,
        })
    })?;

    tasks.collect()
}

/// Milestones of a plan in order, each with its tasks
pub fn get_milestones_for_plan(conn: &Connection, plan_id: &str) -> Result<Vec<Milestone>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, status, priority, start_date, due_date,
                progress, ai_generated
         FROM milestones WHERE plan_id = ?1 ORDER BY position",
    )?;

    let milestones = stmt
        .query_map(params![plan_id], |row| {
            Ok(Milestone {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                status: parsed_column(row, 3)?,
                priority: parsed_column(row, 4)?,
                start_date: date_column(row, 5)?,
                due_date: date_column(row, 6)?,
                progress: progress_column(row, 7)?,
                ai_generated: row.get(8)?,
                tasks: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>>>()?;

    milestones
        .into_iter()
        .map(|mut milestone| {
            milestone.tasks = get_tasks_for_milestone(conn, &milestone.id)?;
            Ok(milestone)
        })
        .collect()
}

fn plan_children<T, F>(conn: &Connection, sql: &str, plan_id: &str, map: F) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![plan_id], map)?;
    rows.collect()
}

/// Load a full plan graph
pub fn get_plan(conn: &Connection, plan_id: &str) -> Result<RoadmapPlan> {
    let mut plan = conn.query_row(
        "SELECT id, user_id, project_id, title, budget, created_at FROM roadmap_plans WHERE id = ?1",
        params![plan_id],
        |row| {
            let created_at: String = row.get(5)?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| conversion_error(5, e.to_string()))?
                .with_timezone(&Utc);
            Ok(RoadmapPlan {
                id: row.get(0)?,
                user_id: row.get(1)?,
                project_id: row.get(2)?,
                title: row.get(3)?,
                budget: row.get(4)?,
                created_at,
                milestones: Vec::new(),
                budget_items: Vec::new(),
                calendar_weeks: Vec::new(),
                risks: Vec::new(),
                tips: Vec::new(),
            })
        },
    )?;

    plan.milestones = get_milestones_for_plan(conn, plan_id)?;
    plan.budget_items = plan_children(
        conn,
        "SELECT name, suggested_cost, actual_cost, notes FROM budget_items
         WHERE plan_id = ?1 ORDER BY position",
        plan_id,
        |row| {
            Ok(BudgetItem {
                name: row.get(0)?,
                suggested_cost: row.get(1)?,
                actual_cost: row.get(2)?,
                notes: row.get(3)?,
            })
        },
    )?;
    plan.calendar_weeks = plan_children(
        conn,
        "SELECT week_number, summary FROM calendar_weeks WHERE plan_id = ?1 ORDER BY week_number",
        plan_id,
        |row| {
            Ok(CalendarWeek {
                week_number: row.get(0)?,
                summary: row.get(1)?,
            })
        },
    )?;
    plan.risks = plan_children(
        conn,
        "SELECT risk, mitigation FROM risks WHERE plan_id = ?1 ORDER BY position",
        plan_id,
        |row| {
            Ok(Risk {
                risk: row.get(0)?,
                mitigation: row.get(1)?,
            })
        },
    )?;
    plan.tips = plan_children(
        conn,
        "SELECT content FROM tips WHERE plan_id = ?1 ORDER BY position",
        plan_id,
        |row| Ok(Tip { content: row.get(0)? }),
    )?;

    Ok(plan)
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    if !COUNTABLE_TABLES.contains(&table) {
        return Err(rusqlite::Error::InvalidParameterName(format!(
            "Unknown table: {}",
            table
        )));
    }
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
}

/// Stored progress of every milestone in the project's plans, by title.
/// When titles repeat across plans the most recent plan wins.
pub fn milestone_progress_by_title(conn: &Connection, project_id: &str) -> Result<Vec<(String, u8)>> {
    let mut stmt = conn.prepare(
        "SELECT m.name, m.progress FROM milestones m
         JOIN roadmap_plans p ON p.id = m.plan_id
         WHERE p.project_id = ?1
         ORDER BY p.created_at, m.position",
    )?;
    let rows = stmt.query_map(params![project_id], |row| {
        Ok((row.get::<_, String>(0)?, progress_column(row, 1)?))
    })?;
    rows.collect()
}

fn task_progress_by_title(conn: &Connection, project_id: &str) -> Result<Vec<(String, u8)>> {
    let mut stmt = conn.prepare(
        "SELECT t.name, t.progress FROM tasks t
         JOIN milestones m ON m.id = t.milestone_id
         JOIN roadmap_plans p ON p.id = m.plan_id
         WHERE p.project_id = ?1
         ORDER BY p.created_at, m.position, t.position",
    )?;
    let rows = stmt.query_map(params![project_id], |row| {
        Ok((row.get::<_, String>(0)?, progress_column(row, 1)?))
    })?;
    rows.collect()
}

/// Progress lookup for the status override on suggestion endpoints
pub fn known_progress(conn: &Connection, project_id: &str) -> Result<KnownProgress> {
    let milestones = milestone_progress_by_title(conn, project_id)?;
    let tasks = task_progress_by_title(conn, project_id)?;

    let known = milestones
        .iter()
        .fold(KnownProgress::new(), |known, (title, progress)| {
            known.with_milestone(title, *progress)
        });
    Ok(tasks
        .iter()
        .fold(known, |known, (title, progress)| known.with_task(title, *progress)))
}

/// Record progress for a milestone
pub fn set_milestone_progress(conn: &Connection, milestone_id: &str, progress: u8) -> Result<()> {
    let updated = conn.execute(
        "UPDATE milestones SET progress = ?1 WHERE id = ?2",
        params![progress.min(100), milestone_id],
    )?;
    if updated == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }
    Ok(())
}
