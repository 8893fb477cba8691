// Project database operations

use crate::models::ProjectStatus;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parent aggregate of a roadmap
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub status: ProjectStatus,
    pub created_at: String,
    pub updated_at: String,
}

fn parse_status(idx: usize, value: String) -> Result<ProjectStatus> {
    value.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

/// Create a project in `planning` state
pub fn create_project(conn: &Connection, name: &str) -> Result<Project> {
    let now = Utc::now().to_rfc3339();
    let id = format!("proj_{}", &Uuid::new_v4().simple().to_string()[..12]);

    conn.execute(
        "INSERT INTO projects (id, name, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id, name, ProjectStatus::Planning.as_str(), &now, &now],
    )?;

    Ok(Project {
        id,
        name: name.to_string(),
        status: ProjectStatus::Planning,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Get a project by ID
pub fn get_project(conn: &Connection, project_id: &str) -> Result<Project> {
    conn.query_row(
        "SELECT id, name, status, created_at, updated_at FROM projects WHERE id = ?1",
        params![project_id],
        |row| {
            Ok(Project {
                id: row.get(0)?,
                name: row.get(1)?,
                status: parse_status(2, row.get(2)?)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        },
    )
}

pub fn get_project_status(conn: &Connection, project_id: &str) -> Result<Option<ProjectStatus>> {
    conn.query_row(
        "SELECT status FROM projects WHERE id = ?1",
        params![project_id],
        |row| row.get::<_, String>(0),
    )
    .optional()?
    .map(|status| parse_status(0, status))
    .transpose()
}

/// Point update of the project status. Fails with `QueryReturnedNoRows`
/// when the project does not exist.
pub fn update_project_status(
    conn: &Connection,
    project_id: &str,
    status: ProjectStatus,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE projects SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), Utc::now().to_rfc3339(), project_id],
    )?;
    if updated == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }
    Ok(())
}
