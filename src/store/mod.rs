mod postgres;
mod seed;
mod sqlite;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use postgres::PostgresStore;
pub use seed::{ensure_defaults, initialize};
pub use sqlite::SqliteStore;
pub use types::{
    AgentRecord, AgentStatus, Direction, MessageRecord, ProjectRecord, SubagentRun, TimelineEvent,
};

/// Orderings offered by project listings: the dashboard wants most recently
/// touched first, the projects page groups by category.
#[derive(Debug, Clone, Copy)]
pub enum ProjectOrder {
    RecentlyUpdated,
    CategoryName,
}

/// Storage backend behind all route handlers. One implementation per SQL
/// dialect; each owns its placeholder syntax and row decoding, and callers
/// never see backend-specific types. Every method checks its connection out
/// for the duration of the call only.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap reachability probe for the health endpoint.
    async fn ping(&self) -> Result<()>;

    /// Create all tables if absent. Safe to call on every start.
    async fn init_schema(&self) -> Result<()>;

    async fn insert_agent(
        &self,
        name: &str,
        role: &str,
        status: AgentStatus,
        description: &str,
    ) -> Result<i64>;
    async fn list_agents(&self) -> Result<Vec<AgentRecord>>;
    async fn get_agent(&self, id: i64) -> Result<Option<AgentRecord>>;
    async fn count_agents(&self) -> Result<i64>;
    /// Also touches `last_active`. Returns false when the agent is unknown.
    async fn set_agent_status(&self, id: i64, status: AgentStatus) -> Result<bool>;

    async fn insert_project(
        &self,
        name: &str,
        category: &str,
        status: &str,
        progress: i64,
        description: &str,
    ) -> Result<i64>;
    async fn list_projects(&self, order: ProjectOrder) -> Result<Vec<ProjectRecord>>;
    async fn get_project(&self, id: i64) -> Result<Option<ProjectRecord>>;
    async fn count_projects(&self) -> Result<i64>;
    async fn set_project_progress(&self, id: i64, progress: i64) -> Result<bool>;
    async fn set_project_status(&self, id: i64, status: &str) -> Result<bool>;

    async fn insert_message(&self, agent_id: i64, content: &str, direction: Direction)
    -> Result<i64>;
    /// Newest first.
    async fn messages_for_agent(&self, agent_id: i64, limit: i64) -> Result<Vec<MessageRecord>>;
    async fn latest_message_for_agent(&self, agent_id: i64) -> Result<Option<MessageRecord>>;

    async fn insert_timeline_event(
        &self,
        event_type: &str,
        title: &str,
        description: &str,
        agent_name: &str,
    ) -> Result<i64>;
    /// Newest first.
    async fn recent_timeline(&self, limit: i64) -> Result<Vec<TimelineEvent>>;
    async fn count_timeline(&self) -> Result<i64>;

    /// Rows start out `running`; there is no completion transition.
    async fn insert_subagent_run(
        &self,
        session_id: &str,
        agent_name: &str,
        task: &str,
    ) -> Result<i64>;
    /// Newest first.
    async fn recent_subagent_runs(&self, limit: i64) -> Result<Vec<SubagentRun>>;
}

pub type SharedStore = Arc<dyn Store>;
