use std::path::PathBuf;

const DEFAULT_SQLITE_PATH: &str = "data/mission_control.db";
const DEFAULT_PORT: u16 = 5000;

/// Storage backend chosen at startup. `DATABASE_URL` selects PostgreSQL;
/// otherwise the server falls back to a local SQLite file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    Postgres { url: String },
    Sqlite { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database: DatabaseConfig,
    pub secret_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let database = match get("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => DatabaseConfig::Postgres {
                url: normalize_postgres_url(url),
            },
            None => DatabaseConfig::Sqlite {
                path: get("SQLITE_PATH")
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SQLITE_PATH)),
            },
        };

        let port = get("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let secret_key = get("SECRET_KEY").filter(|k| !k.is_empty());

        Config {
            port,
            database,
            secret_key,
        }
    }
}

/// Hosted platforms hand out `postgres://` URLs; the driver wants the
/// `postgresql://` scheme.
fn normalize_postgres_url(url: String) -> String {
    match url.strip_prefix("postgres://") {
        Some(rest) => format!("postgresql://{rest}"),
        None => url,
    }
}
