use axum::extract::{Path, State};
use axum::response::Html;
use tracing::error;

use crate::store::{AgentRecord, MessageRecord, ProjectOrder, Store, SubagentRun, TimelineEvent};
use crate::web::AppState;

const LAYOUT: &str = include_str!("../templates/layout.html");

/// Every page degrades the same way: on a storage error it renders with
/// empty data and a flash banner instead of surfacing a 5xx.
fn render(title: &str, flash: Option<&str>, content: String) -> Html<String> {
    let flash_html = match flash {
        Some(message) => format!(r#"<div class="flash">{}</div>"#, escape(message)),
        None => String::new(),
    };
    Html(
        LAYOUT
            .replace("{{title}}", &escape(title))
            .replace("{{flash}}", &flash_html)
            .replace("{{content}}", &content),
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Status tally shown on the dashboard, computed in-process from the
/// fetched rows rather than with extra aggregate queries.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct AgentStats {
    pub total: usize,
    pub active: usize,
    pub idle: usize,
    pub busy: usize,
}

impl AgentStats {
    pub(crate) fn tally(agents: &[AgentRecord]) -> Self {
        let mut stats = AgentStats {
            total: agents.len(),
            ..Default::default()
        };
        for agent in agents {
            match agent.status.as_str() {
                "active" => stats.active += 1,
                "idle" => stats.idle += 1,
                "busy" => stats.busy += 1,
                _ => {}
            }
        }
        stats
    }
}

// --- Page handlers ---

pub async fn dashboard(State(state): State<AppState>) -> Html<String> {
    match load_dashboard(&state).await {
        Ok(content) => render("Dashboard", None, content),
        Err(e) => {
            error!("Dashboard error: {e:#}");
            render("Dashboard", Some("Error loading dashboard"), String::new())
        }
    }
}

async fn load_dashboard(state: &AppState) -> anyhow::Result<String> {
    let agents = state.store.list_agents().await?;
    let stats = AgentStats::tally(&agents);
    let projects = state.store.list_projects(ProjectOrder::RecentlyUpdated).await?;
    let timeline = state.store.recent_timeline(20).await?;

    let mut latest_messages = Vec::with_capacity(agents.len());
    for agent in &agents {
        latest_messages.push(state.store.latest_message_for_agent(agent.id).await?);
    }

    let mut content = stats_bar(&stats);
    content.push_str("<h2>Agents</h2>");
    content.push_str(&agents_table(&agents, Some(&latest_messages)));
    content.push_str("<h2>Projects</h2>");
    content.push_str(&projects_table(&projects));
    content.push_str("<h2>Recent Activity</h2>");
    content.push_str(&timeline_list(&timeline));
    Ok(content)
}

pub async fn agents(State(state): State<AppState>) -> Html<String> {
    match state.store.list_agents().await {
        Ok(agents) => render("Agents", None, agents_table(&agents, None)),
        Err(e) => {
            error!("Agents page error: {e:#}");
            render("Agents", Some("Error loading agents"), String::new())
        }
    }
}

pub async fn agent_detail(
    Path(agent_id): Path<i64>,
    State(state): State<AppState>,
) -> Html<String> {
    match load_agent_detail(&state, agent_id).await {
        Ok(Some((title, content))) => render(&title, None, content),
        // Unknown agent: fall back to the roster with a flash, like the
        // original's redirect-with-flash.
        Ok(None) => {
            let agents = state.store.list_agents().await.unwrap_or_default();
            render("Agents", Some("Agent not found"), agents_table(&agents, None))
        }
        Err(e) => {
            error!("Agent detail error: {e:#}");
            render("Agents", Some("Error loading agent"), String::new())
        }
    }
}

async fn load_agent_detail(
    state: &AppState,
    agent_id: i64,
) -> anyhow::Result<Option<(String, String)>> {
    let Some(agent) = state.store.get_agent(agent_id).await? else {
        return Ok(None);
    };
    let messages = state.store.messages_for_agent(agent_id, 50).await?;

    let mut content = format!(
        r#"<p><span class="status {status}">{status}</span> {role} · {description}</p>"#,
        status = escape(&agent.status),
        role = escape(&agent.role),
        description = escape(&agent.description),
    );
    content.push_str("<h2>Messages</h2>");
    content.push_str(&messages_list(&messages));
    Ok(Some((format!("Agent {}", agent.name), content)))
}

pub async fn projects(State(state): State<AppState>) -> Html<String> {
    match state.store.list_projects(ProjectOrder::CategoryName).await {
        Ok(projects) => render("Projects", None, projects_table(&projects)),
        Err(e) => {
            error!("Projects page error: {e:#}");
            render("Projects", Some("Error loading projects"), String::new())
        }
    }
}

pub async fn command_center(State(state): State<AppState>) -> Html<String> {
    match load_command_center(&state).await {
        Ok(content) => render("Command Center", None, content),
        Err(e) => {
            error!("Command center error: {e:#}");
            render(
                "Command Center",
                Some("Error loading command center"),
                String::new(),
            )
        }
    }
}

async fn load_command_center(state: &AppState) -> anyhow::Result<String> {
    let agents = state.store.list_agents().await?;
    let runs = state.store.recent_subagent_runs(10).await?;

    let mut content = String::from("<h2>Agents</h2>");
    content.push_str(&agents_table(&agents, None));
    content.push_str("<h2>Recent Subagent Runs</h2>");
    content.push_str(&subagents_table(&runs));
    Ok(content)
}

pub async fn timeline(State(state): State<AppState>) -> Html<String> {
    match state.store.recent_timeline(100).await {
        Ok(events) => render("Timeline", None, timeline_list(&events)),
        Err(e) => {
            error!("Timeline error: {e:#}");
            render("Timeline", Some("Error loading timeline"), String::new())
        }
    }
}

pub fn not_found() -> Html<String> {
    render(
        "Not Found",
        Some("The page you requested does not exist"),
        r#"<p><a href="/">Back to the dashboard</a></p>"#.to_string(),
    )
}

// --- Fragment builders ---

fn stats_bar(stats: &AgentStats) -> String {
    let card = |value: usize, label: &str| {
        format!(
            r#"<div class="stat"><div class="value">{value}</div><div class="label">{label}</div></div>"#
        )
    };
    format!(
        r#"<div class="stats">{}{}{}{}</div>"#,
        card(stats.total, "Agents"),
        card(stats.active, "Active"),
        card(stats.idle, "Idle"),
        card(stats.busy, "Busy"),
    )
}

fn agents_table(agents: &[AgentRecord], latest: Option<&[Option<MessageRecord>]>) -> String {
    if agents.is_empty() {
        return r#"<p class="empty">No agents yet.</p>"#.to_string();
    }

    let last_message_header = if latest.is_some() {
        "<th>Last Message</th>"
    } else {
        ""
    };
    let mut rows = String::new();
    for (i, agent) in agents.iter().enumerate() {
        let last_message_cell = match latest {
            Some(messages) => {
                let text = messages
                    .get(i)
                    .and_then(|m| m.as_ref())
                    .map(|m| escape(&m.content))
                    .unwrap_or_default();
                format!("<td>{text}</td>")
            }
            None => String::new(),
        };
        rows.push_str(&format!(
            r#"<tr><td><a href="/agent/{id}">{name}</a></td><td>{role}</td><td><span class="status {status}">{status}</span></td><td>{last_active}</td>{last_message_cell}</tr>"#,
            id = agent.id,
            name = escape(&agent.name),
            role = escape(&agent.role),
            status = escape(&agent.status),
            last_active = escape(&agent.last_active),
        ));
    }
    format!(
        "<table><tr><th>Name</th><th>Role</th><th>Status</th><th>Last Active</th>{last_message_header}</tr>{rows}</table>"
    )
}

fn projects_table(projects: &[crate::store::ProjectRecord]) -> String {
    if projects.is_empty() {
        return r#"<p class="empty">No projects yet.</p>"#.to_string();
    }

    let mut rows = String::new();
    for project in projects {
        rows.push_str(&format!(
            r#"<tr><td>{name}</td><td>{category}</td><td><span class="status {status}">{status}</span></td><td><div class="meter"><div style="width:{progress}%"></div></div> {progress}%</td><td>{updated_at}</td></tr>"#,
            name = escape(&project.name),
            category = escape(&project.category),
            status = escape(&project.status),
            progress = project.progress,
            updated_at = escape(&project.updated_at),
        ));
    }
    format!(
        "<table><tr><th>Project</th><th>Category</th><th>Status</th><th>Progress</th><th>Updated</th></tr>{rows}</table>"
    )
}

fn timeline_list(events: &[TimelineEvent]) -> String {
    if events.is_empty() {
        return r#"<p class="empty">No activity yet.</p>"#.to_string();
    }

    let mut out = String::new();
    for event in events {
        out.push_str(&format!(
            r#"<div class="event"><strong>{title}</strong> {description}<div class="meta">{event_type} · {agent_name} · {created_at}</div></div>"#,
            title = escape(&event.title),
            description = escape(&event.description),
            event_type = escape(&event.event_type),
            agent_name = escape(&event.agent_name),
            created_at = escape(&event.created_at),
        ));
    }
    out
}

fn messages_list(messages: &[MessageRecord]) -> String {
    if messages.is_empty() {
        return r#"<p class="empty">No messages yet.</p>"#.to_string();
    }

    let mut out = String::new();
    for message in messages {
        out.push_str(&format!(
            r#"<div class="event">{content}<div class="meta">{direction} · {created_at}</div></div>"#,
            content = escape(&message.content),
            direction = escape(&message.direction),
            created_at = escape(&message.created_at),
        ));
    }
    out
}

fn subagents_table(runs: &[SubagentRun]) -> String {
    if runs.is_empty() {
        return r#"<p class="empty">No subagent runs yet.</p>"#.to_string();
    }

    let mut rows = String::new();
    for run in runs {
        rows.push_str(&format!(
            r#"<tr><td>{session_id}</td><td>{agent_name}</td><td>{task}</td><td><span class="status {status}">{status}</span></td><td>{created_at}</td></tr>"#,
            session_id = escape(&run.session_id),
            agent_name = escape(&run.agent_name),
            task = escape(&run.task),
            status = escape(&run.status),
            created_at = escape(&run.created_at),
        ));
    }
    format!(
        "<table><tr><th>Session</th><th>Agent</th><th>Task</th><th>Status</th><th>Started</th></tr>{rows}</table>"
    )
}
