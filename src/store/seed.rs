use anyhow::Result;
use tracing::info;

use super::{AgentStatus, Store};

const DEFAULT_AGENTS: &[(&str, &str, &str)] = &[
    ("Alpha", "Research Assistant", "Web research and data gathering"),
    ("Beta", "Code Reviewer", "Code analysis and optimization"),
    ("Gamma", "Content Writer", "Documentation and content creation"),
    ("Delta", "Data Analyst", "Data processing and visualization"),
    ("Epsilon", "DevOps Engineer", "Infrastructure and deployment"),
];

const DEFAULT_PROJECTS: &[(&str, &str, &str, i64, &str)] = &[
    (
        "YouTube Automation",
        "youtube",
        "active",
        65,
        "Automated video production pipeline",
    ),
    (
        "Betting Analytics",
        "betting",
        "active",
        40,
        "Sports betting data analysis system",
    ),
    (
        "F-Gas Compliance",
        "f-gas",
        "paused",
        80,
        "Refrigerant tracking and compliance",
    ),
    (
        "Trading Bot",
        "trading",
        "active",
        25,
        "Automated cryptocurrency trading",
    ),
];

/// Create tables and seed default rows. Called on every start; both steps
/// are no-ops once their data exists.
pub async fn initialize(store: &dyn Store) -> Result<()> {
    store.init_schema().await?;
    info!("Database tables initialized successfully");
    ensure_defaults(store).await
}

/// Insert the default fleet, projects, and bootstrap timeline event, each
/// only when its table is empty. Existing rows are never overwritten.
pub async fn ensure_defaults(store: &dyn Store) -> Result<()> {
    if store.count_agents().await? == 0 {
        for (name, role, description) in DEFAULT_AGENTS {
            store
                .insert_agent(name, role, AgentStatus::Idle, description)
                .await?;
        }
        info!("Default agents inserted");
    }

    if store.count_projects().await? == 0 {
        for (name, category, status, progress, description) in DEFAULT_PROJECTS {
            store
                .insert_project(name, category, status, *progress, description)
                .await?;
        }
        info!("Default projects inserted");
    }

    if store.count_timeline().await? == 0 {
        store
            .insert_timeline_event(
                "system",
                "Mission Control Started",
                "System initialized and ready",
                "System",
            )
            .await?;
        info!("Initial timeline event inserted");
    }

    Ok(())
}
