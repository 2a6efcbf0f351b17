use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::types::{
    AgentRecord, AgentStatus, Direction, MessageRecord, ProjectRecord, SubagentRun, TimelineEvent,
};
use super::{ProjectOrder, Store};

/// SQLite backend for local development. The connection lives behind an async
/// mutex; every operation acquires it for its own scope and releases it when
/// the guard drops, so no connection state leaks across requests.
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let db = Connection::open(&path)?;
        db.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }
}

fn agent_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgentRecord> {
    Ok(AgentRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        status: row.get(3)?,
        description: row.get(4)?,
        created_at: row.get(5)?,
        last_active: row.get(6)?,
    })
}

fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectRecord> {
    Ok(ProjectRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        status: row.get(3)?,
        progress: row.get(4)?,
        description: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        content: row.get(2)?,
        direction: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const AGENT_COLS: &str = "id, name, role, status, description, created_at, last_active";
const PROJECT_COLS: &str = "id, name, category, status, progress, description, created_at, updated_at";
const MESSAGE_COLS: &str = "id, agent_id, content, direction, created_at";

#[async_trait]
impl Store for SqliteStore {
    async fn ping(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    async fn init_schema(&self) -> Result<()> {
        let db = self.db.lock().await;

        db.execute(
            "CREATE TABLE IF NOT EXISTS agents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'idle',
                description TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                last_active TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                category TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                progress INTEGER NOT NULL DEFAULT 0,
                description TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                direction TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (agent_id) REFERENCES agents (id)
            )",
            [],
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS timeline (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_type TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                agent_name TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS subagents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                agent_name TEXT NOT NULL,
                task TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'running',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                completed_at TIMESTAMP
            )",
            [],
        )?;

        Ok(())
    }

    async fn insert_agent(
        &self,
        name: &str,
        role: &str,
        status: AgentStatus,
        description: &str,
    ) -> Result<i64> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO agents (name, role, status, description) VALUES (?1, ?2, ?3, ?4)",
            params![name, role, status.as_str(), description],
        )?;
        Ok(db.last_insert_rowid())
    }

    async fn list_agents(&self) -> Result<Vec<AgentRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!("SELECT {AGENT_COLS} FROM agents ORDER BY name"))?;
        let rows = stmt.query_map([], agent_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    async fn get_agent(&self, id: i64) -> Result<Option<AgentRecord>> {
        let db = self.db.lock().await;
        let agent = db
            .query_row(
                &format!("SELECT {AGENT_COLS} FROM agents WHERE id = ?1"),
                params![id],
                agent_from_row,
            )
            .optional()?;
        Ok(agent)
    }

    async fn count_agents(&self) -> Result<i64> {
        let db = self.db.lock().await;
        let count = db.query_row("SELECT COUNT(*) FROM agents", [], |row| row.get(0))?;
        Ok(count)
    }

    async fn set_agent_status(&self, id: i64, status: AgentStatus) -> Result<bool> {
        let db = self.db.lock().await;
        let updated = db.execute(
            "UPDATE agents SET status = ?1, last_active = CURRENT_TIMESTAMP WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(updated > 0)
    }

    async fn insert_project(
        &self,
        name: &str,
        category: &str,
        status: &str,
        progress: i64,
        description: &str,
    ) -> Result<i64> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO projects (name, category, status, progress, description)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, category, status, progress, description],
        )?;
        Ok(db.last_insert_rowid())
    }

    async fn list_projects(&self, order: ProjectOrder) -> Result<Vec<ProjectRecord>> {
        let order_by = match order {
            ProjectOrder::RecentlyUpdated => "updated_at DESC, id DESC",
            ProjectOrder::CategoryName => "category, name",
        };

        let db = self.db.lock().await;
        let mut stmt =
            db.prepare(&format!("SELECT {PROJECT_COLS} FROM projects ORDER BY {order_by}"))?;
        let rows = stmt.query_map([], project_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    async fn get_project(&self, id: i64) -> Result<Option<ProjectRecord>> {
        let db = self.db.lock().await;
        let project = db
            .query_row(
                &format!("SELECT {PROJECT_COLS} FROM projects WHERE id = ?1"),
                params![id],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    async fn count_projects(&self) -> Result<i64> {
        let db = self.db.lock().await;
        let count = db.query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;
        Ok(count)
    }

    async fn set_project_progress(&self, id: i64, progress: i64) -> Result<bool> {
        let db = self.db.lock().await;
        let updated = db.execute(
            "UPDATE projects SET progress = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![progress, id],
        )?;
        Ok(updated > 0)
    }

    async fn set_project_status(&self, id: i64, status: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let updated = db.execute(
            "UPDATE projects SET status = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![status, id],
        )?;
        Ok(updated > 0)
    }

    async fn insert_message(
        &self,
        agent_id: i64,
        content: &str,
        direction: Direction,
    ) -> Result<i64> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO messages (agent_id, content, direction) VALUES (?1, ?2, ?3)",
            params![agent_id, content, direction.as_str()],
        )?;
        Ok(db.last_insert_rowid())
    }

    async fn messages_for_agent(&self, agent_id: i64, limit: i64) -> Result<Vec<MessageRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {MESSAGE_COLS} FROM messages
             WHERE agent_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![agent_id, limit], message_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    async fn latest_message_for_agent(&self, agent_id: i64) -> Result<Option<MessageRecord>> {
        let db = self.db.lock().await;
        let message = db
            .query_row(
                &format!(
                    "SELECT {MESSAGE_COLS} FROM messages
                     WHERE agent_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1"
                ),
                params![agent_id],
                message_from_row,
            )
            .optional()?;
        Ok(message)
    }

    async fn insert_timeline_event(
        &self,
        event_type: &str,
        title: &str,
        description: &str,
        agent_name: &str,
    ) -> Result<i64> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO timeline (event_type, title, description, agent_name)
             VALUES (?1, ?2, ?3, ?4)",
            params![event_type, title, description, agent_name],
        )?;
        Ok(db.last_insert_rowid())
    }

    async fn recent_timeline(&self, limit: i64) -> Result<Vec<TimelineEvent>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, event_type, title, description, agent_name, created_at
             FROM timeline ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(TimelineEvent {
                id: row.get(0)?,
                event_type: row.get(1)?,
                title: row.get(2)?,
                description: row.get(3)?,
                agent_name: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    async fn count_timeline(&self) -> Result<i64> {
        let db = self.db.lock().await;
        let count = db.query_row("SELECT COUNT(*) FROM timeline", [], |row| row.get(0))?;
        Ok(count)
    }

    async fn insert_subagent_run(
        &self,
        session_id: &str,
        agent_name: &str,
        task: &str,
    ) -> Result<i64> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO subagents (session_id, agent_name, task, status)
             VALUES (?1, ?2, ?3, 'running')",
            params![session_id, agent_name, task],
        )?;
        Ok(db.last_insert_rowid())
    }

    async fn recent_subagent_runs(&self, limit: i64) -> Result<Vec<SubagentRun>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, session_id, agent_name, task, status, created_at, completed_at
             FROM subagents ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(SubagentRun {
                id: row.get(0)?,
                session_id: row.get(1)?,
                agent_name: row.get(2)?,
                task: row.get(3)?,
                status: row.get(4)?,
                created_at: row.get(5)?,
                completed_at: row.get(6)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
