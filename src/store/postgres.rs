use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use tokio_postgres::{NoTls, Row};

use super::types::{
    AgentRecord, AgentStatus, Direction, MessageRecord, ProjectRecord, SubagentRun, TimelineEvent,
};
use super::{ProjectOrder, Store};

/// PostgreSQL backend for hosted deployments. Connections come from a
/// deadpool pool; each operation checks one out for its own scope. The pool
/// connects lazily, so constructing the store never touches the network and
/// an unreachable database only surfaces on first use.
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    pub fn connect(url: &str) -> Result<Self> {
        let pg_config: tokio_postgres::Config =
            url.parse().context("invalid PostgreSQL connection URL")?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager)
            .max_size(16)
            .build()
            .context("failed to build PostgreSQL pool")?;

        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<Object> {
        Ok(self.pool.get().await?)
    }
}

/// Postgres hands timestamps back as typed values; flatten them to the same
/// `YYYY-MM-DD HH:MM:SS` text SQLite stores so records look identical across
/// backends.
fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn agent_from_row(row: &Row) -> AgentRecord {
    AgentRecord {
        id: row.get(0),
        name: row.get(1),
        role: row.get(2),
        status: row.get(3),
        description: row.get(4),
        created_at: fmt_ts(row.get(5)),
        last_active: fmt_ts(row.get(6)),
    }
}

fn project_from_row(row: &Row) -> ProjectRecord {
    let progress: i32 = row.get(4);
    ProjectRecord {
        id: row.get(0),
        name: row.get(1),
        category: row.get(2),
        status: row.get(3),
        progress: progress as i64,
        description: row.get(5),
        created_at: fmt_ts(row.get(6)),
        updated_at: fmt_ts(row.get(7)),
    }
}

fn message_from_row(row: &Row) -> MessageRecord {
    MessageRecord {
        id: row.get(0),
        agent_id: row.get(1),
        content: row.get(2),
        direction: row.get(3),
        created_at: fmt_ts(row.get(4)),
    }
}

const AGENT_COLS: &str = "id, name, role, status, description, created_at, last_active";
const PROJECT_COLS: &str = "id, name, category, status, progress, description, created_at, updated_at";
const MESSAGE_COLS: &str = "id, agent_id, content, direction, created_at";

#[async_trait]
impl Store for PostgresStore {
    async fn ping(&self) -> Result<()> {
        let conn = self.conn().await?;
        conn.query_one("SELECT 1", &[]).await?;
        Ok(())
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn().await?;
        conn.batch_execute(
            "CREATE TABLE IF NOT EXISTS agents (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'idle',
                description TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                last_active TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS projects (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                category TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                progress INTEGER NOT NULL DEFAULT 0,
                description TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS messages (
                id BIGSERIAL PRIMARY KEY,
                agent_id BIGINT NOT NULL REFERENCES agents (id),
                content TEXT NOT NULL,
                direction TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS timeline (
                id BIGSERIAL PRIMARY KEY,
                event_type TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                agent_name TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS subagents (
                id BIGSERIAL PRIMARY KEY,
                session_id TEXT NOT NULL,
                agent_name TEXT NOT NULL,
                task TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'running',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                completed_at TIMESTAMP
            );",
        )
        .await?;
        Ok(())
    }

    async fn insert_agent(
        &self,
        name: &str,
        role: &str,
        status: AgentStatus,
        description: &str,
    ) -> Result<i64> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO agents (name, role, status, description)
                 VALUES ($1, $2, $3, $4) RETURNING id",
                &[&name, &role, &status.as_str(), &description],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn list_agents(&self) -> Result<Vec<AgentRecord>> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                &format!("SELECT {AGENT_COLS} FROM agents ORDER BY name"),
                &[],
            )
            .await?;
        Ok(rows.iter().map(agent_from_row).collect())
    }

    async fn get_agent(&self, id: i64) -> Result<Option<AgentRecord>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                &format!("SELECT {AGENT_COLS} FROM agents WHERE id = $1"),
                &[&id],
            )
            .await?;
        Ok(row.as_ref().map(agent_from_row))
    }

    async fn count_agents(&self) -> Result<i64> {
        let conn = self.conn().await?;
        let row = conn.query_one("SELECT COUNT(*) FROM agents", &[]).await?;
        Ok(row.get(0))
    }

    async fn set_agent_status(&self, id: i64, status: AgentStatus) -> Result<bool> {
        let conn = self.conn().await?;
        let updated = conn
            .execute(
                "UPDATE agents SET status = $1, last_active = CURRENT_TIMESTAMP WHERE id = $2",
                &[&status.as_str(), &id],
            )
            .await?;
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
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO projects (name, category, status, progress, description)
                 VALUES ($1, $2, $3, $4, $5) RETURNING id",
                &[&name, &category, &status, &(progress as i32), &description],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn list_projects(&self, order: ProjectOrder) -> Result<Vec<ProjectRecord>> {
        let order_by = match order {
            ProjectOrder::RecentlyUpdated => "updated_at DESC, id DESC",
            ProjectOrder::CategoryName => "category, name",
        };

        let conn = self.conn().await?;
        let rows = conn
            .query(
                &format!("SELECT {PROJECT_COLS} FROM projects ORDER BY {order_by}"),
                &[],
            )
            .await?;
        Ok(rows.iter().map(project_from_row).collect())
    }

    async fn get_project(&self, id: i64) -> Result<Option<ProjectRecord>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                &format!("SELECT {PROJECT_COLS} FROM projects WHERE id = $1"),
                &[&id],
            )
            .await?;
        Ok(row.as_ref().map(project_from_row))
    }

    async fn count_projects(&self) -> Result<i64> {
        let conn = self.conn().await?;
        let row = conn.query_one("SELECT COUNT(*) FROM projects", &[]).await?;
        Ok(row.get(0))
    }

    async fn set_project_progress(&self, id: i64, progress: i64) -> Result<bool> {
        let conn = self.conn().await?;
        let updated = conn
            .execute(
                "UPDATE projects SET progress = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
                &[&(progress as i32), &id],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn set_project_status(&self, id: i64, status: &str) -> Result<bool> {
        let conn = self.conn().await?;
        let updated = conn
            .execute(
                "UPDATE projects SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
                &[&status, &id],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn insert_message(
        &self,
        agent_id: i64,
        content: &str,
        direction: Direction,
    ) -> Result<i64> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO messages (agent_id, content, direction)
                 VALUES ($1, $2, $3) RETURNING id",
                &[&agent_id, &content, &direction.as_str()],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn messages_for_agent(&self, agent_id: i64, limit: i64) -> Result<Vec<MessageRecord>> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                &format!(
                    "SELECT {MESSAGE_COLS} FROM messages
                     WHERE agent_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2"
                ),
                &[&agent_id, &limit],
            )
            .await?;
        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn latest_message_for_agent(&self, agent_id: i64) -> Result<Option<MessageRecord>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                &format!(
                    "SELECT {MESSAGE_COLS} FROM messages
                     WHERE agent_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1"
                ),
                &[&agent_id],
            )
            .await?;
        Ok(row.as_ref().map(message_from_row))
    }

    async fn insert_timeline_event(
        &self,
        event_type: &str,
        title: &str,
        description: &str,
        agent_name: &str,
    ) -> Result<i64> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO timeline (event_type, title, description, agent_name)
                 VALUES ($1, $2, $3, $4) RETURNING id",
                &[&event_type, &title, &description, &agent_name],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn recent_timeline(&self, limit: i64) -> Result<Vec<TimelineEvent>> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT id, event_type, title, description, agent_name, created_at
                 FROM timeline ORDER BY created_at DESC, id DESC LIMIT $1",
                &[&limit],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|row| TimelineEvent {
                id: row.get(0),
                event_type: row.get(1),
                title: row.get(2),
                description: row.get(3),
                agent_name: row.get(4),
                created_at: fmt_ts(row.get(5)),
            })
            .collect())
    }

    async fn count_timeline(&self) -> Result<i64> {
        let conn = self.conn().await?;
        let row = conn.query_one("SELECT COUNT(*) FROM timeline", &[]).await?;
        Ok(row.get(0))
    }

    async fn insert_subagent_run(
        &self,
        session_id: &str,
        agent_name: &str,
        task: &str,
    ) -> Result<i64> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO subagents (session_id, agent_name, task, status)
                 VALUES ($1, $2, $3, 'running') RETURNING id",
                &[&session_id, &agent_name, &task],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn recent_subagent_runs(&self, limit: i64) -> Result<Vec<SubagentRun>> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT id, session_id, agent_name, task, status, created_at, completed_at
                 FROM subagents ORDER BY created_at DESC, id DESC LIMIT $1",
                &[&limit],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|row| SubagentRun {
                id: row.get(0),
                session_id: row.get(1),
                agent_name: row.get(2),
                task: row.get(3),
                status: row.get(4),
                created_at: fmt_ts(row.get(5)),
                completed_at: row.get::<_, Option<NaiveDateTime>>(6).map(fmt_ts),
            })
            .collect())
    }
}
