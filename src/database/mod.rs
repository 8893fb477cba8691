// SQLite database operations and migrations

pub mod plans;
pub mod projects;
pub mod transactions;

use crate::error::IngestError;
use crate::models::{Milestone, RoadmapPlan};
use crate::parsers::suggestions::KnownProgress;
use rusqlite::{params, Connection, Result};
use std::path::Path;

const SCHEMA_VERSION: i32 = 2;

/// Transactional sink for resolved entity graphs. Ownership of the plan and
/// project is checked before anything reaches the store.
pub trait PlanStore {
    /// Write a whole plan graph and advance its project in one transaction
    fn commit_roadmap(&mut self, plan: &RoadmapPlan) -> std::result::Result<(), IngestError>;

    /// Write one milestone with its tasks under an existing plan
    fn commit_milestone(
        &mut self,
        plan_id: &str,
        project_id: &str,
        milestone: &Milestone,
    ) -> std::result::Result<(), IngestError>;

    /// Progress already recorded for the project's milestones and tasks
    fn known_progress(&self, project_id: &str) -> std::result::Result<KnownProgress, IngestError>;
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        // Enable foreign key enforcement - must be done on each connection
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    pub fn init(&self) -> Result<()> {
        self.create_metadata_table()?;
        let version = self.get_schema_version()?;

        // Refuse a database written by a newer build
        if version > SCHEMA_VERSION {
            return Err(rusqlite::Error::InvalidParameterName(format!(
                "Database schema version {} is newer than application version {}. Please upgrade the application.",
                version, SCHEMA_VERSION
            )));
        }

        if version < SCHEMA_VERSION {
            self.run_migrations(version)?;
            self.set_schema_version(SCHEMA_VERSION)?;
            log::info!("Migrated database schema from v{} to v{}", version, SCHEMA_VERSION);
        }

        Ok(())
    }

    fn create_metadata_table(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn get_schema_version(&self) -> Result<i32> {
        let version: Result<String> = self.conn.query_row(
            "SELECT value FROM schema_metadata WHERE key = 'version'",
            [],
            |row| row.get(0),
        );

        match version {
            Ok(v) => Ok(v.parse().unwrap_or(0)),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                self.conn.execute(
                    "INSERT INTO schema_metadata (key, value) VALUES ('version', '0')",
                    [],
                )?;
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    fn set_schema_version(&self, version: i32) -> Result<()> {
        self.conn.execute(
            "UPDATE schema_metadata SET value = ?1 WHERE key = 'version'",
            params![version.to_string()],
        )?;
        Ok(())
    }

    fn run_migrations(&self, from_version: i32) -> Result<()> {
        if from_version < 1 {
            self.migrate_to_v1()?;
        }
        if from_version < 2 {
            self.migrate_to_v2()?;
        }
        Ok(())
    }

    fn migrate_to_v1(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS roadmap_plans (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                project_id TEXT NOT NULL,
                title TEXT NOT NULL,
                budget REAL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS milestones (
                id TEXT PRIMARY KEY,
                plan_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                start_date TEXT NOT NULL,
                due_date TEXT NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                ai_generated INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (plan_id) REFERENCES roadmap_plans(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                milestone_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                start_date TEXT NOT NULL,
                due_date TEXT NOT NULL,
                estimated_duration TEXT,
                FOREIGN KEY (milestone_id) REFERENCES milestones(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS budget_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plan_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                suggested_cost REAL NOT NULL,
                actual_cost REAL,
                notes TEXT NOT NULL,
                FOREIGN KEY (plan_id) REFERENCES roadmap_plans(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS calendar_weeks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plan_id TEXT NOT NULL,
                week_number INTEGER NOT NULL,
                summary TEXT NOT NULL,
                UNIQUE (plan_id, week_number),
                FOREIGN KEY (plan_id) REFERENCES roadmap_plans(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS risks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plan_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                risk TEXT NOT NULL,
                mitigation TEXT NOT NULL,
                FOREIGN KEY (plan_id) REFERENCES roadmap_plans(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS tips (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plan_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                content TEXT NOT NULL,
                FOREIGN KEY (plan_id) REFERENCES roadmap_plans(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_plans_project_id ON roadmap_plans(project_id);
            CREATE INDEX IF NOT EXISTS idx_milestones_plan_id ON milestones(plan_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_milestone_id ON tasks(milestone_id);",
        )?;
        Ok(())
    }

    fn migrate_to_v2(&self) -> Result<()> {
        // Task progress feeds the status override for task suggestions
        self.conn.execute(
            "ALTER TABLE tasks ADD COLUMN progress INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
        Ok(())
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn get_connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl PlanStore for Database {
    fn commit_roadmap(&mut self, plan: &RoadmapPlan) -> std::result::Result<(), IngestError> {
        plans::commit_roadmap(&mut self.conn, plan)
    }

    fn commit_milestone(
        &mut self,
        plan_id: &str,
        project_id: &str,
        milestone: &Milestone,
    ) -> std::result::Result<(), IngestError> {
        plans::commit_milestone(&mut self.conn, plan_id, project_id, milestone)
    }

    fn known_progress(&self, project_id: &str) -> std::result::Result<KnownProgress, IngestError> {
        Ok(plans::known_progress(&self.conn, project_id)?)
    }
}
