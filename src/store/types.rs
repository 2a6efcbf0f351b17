/// Agent lifecycle states accepted by write paths. Rows keep the raw text so
/// historical values survive unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Idle,
    Active,
    Busy,
    Standby,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Active => "active",
            AgentStatus::Busy => "busy",
            AgentStatus::Standby => "standby",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outbound => "outbound",
            Direction::Inbound => "inbound",
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AgentRecord {
    pub id: i64,
    pub name: String,
    pub role: String,
    pub status: String,
    pub description: String,
    pub created_at: String,
    pub last_active: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProjectRecord {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub status: String,
    pub progress: i64,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MessageRecord {
    pub id: i64,
    pub agent_id: i64,
    pub content: String,
    pub direction: String,
    pub created_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TimelineEvent {
    pub id: i64,
    pub event_type: String,
    pub title: String,
    pub description: String,
    pub agent_name: String,
    pub created_at: String,
}

/// A dispatched subagent run. `completed_at` stays empty until a completion
/// path exists; nothing writes it today.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubagentRun {
    pub id: i64,
    pub session_id: String,
    pub agent_name: String,
    pub task: String,
    pub status: String,
    pub created_at: String,
    pub completed_at: Option<String>,
}
