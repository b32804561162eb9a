use crate::constants;
use crate::error::{CrmError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Process-wide settings, assembled once at startup and shared read-only.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub jobs: JobsConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// How scheduled jobs reach the GraphQL endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Defaults to this process's own `/graphql` on `server.port`
    pub graphql_url: Option<String>,
    pub timeout_seconds: u64,
    pub retries: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub heartbeat_log: PathBuf,
    pub low_stock_log: PathBuf,
    pub order_reminders_log: PathBuf,
    pub report_log: PathBuf,
    pub reminder_window_days: i64,
    pub low_stock_threshold: i64,
    pub restock_amount: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub addr: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8000 }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("crm.sqlite3") }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            graphql_url: None,
            timeout_seconds: 20,
            retries: 2,
            retry_delay_ms: 500,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            heartbeat_log: PathBuf::from(constants::HEARTBEAT_LOG),
            low_stock_log: PathBuf::from(constants::LOW_STOCK_LOG),
            order_reminders_log: PathBuf::from(constants::ORDER_REMINDERS_LOG),
            report_log: PathBuf::from(constants::REPORT_LOG),
            reminder_window_days: 7,
            low_stock_threshold: 10,
            restock_amount: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("logs") }
    }
}

impl Config {
    /// Load settings from `path` (or `config.toml` when present), then apply
    /// `CRM_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new("config.toml").exists() => Self::from_file(Path::new("config.toml"))?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Endpoint the jobs call: the configured URL, or the local server.
    pub fn graphql_url(&self) -> String {
        match &self.api.graphql_url {
            Some(url) => url.clone(),
            None => format!("http://localhost:{}/graphql", self.server.port),
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CrmError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CRM_DATABASE_PATH") {
            self.database.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CRM_GRAPHQL_URL") {
            self.api.graphql_url = Some(v);
        }
        if let Some(v) = lookup("CRM_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("CRM_PORT") {
            self.server.port = v
                .parse()
                .map_err(|_| CrmError::Config(format!("CRM_PORT is not a valid port: '{}'", v)))?;
        }
        if let Some(v) = lookup("CRM_LOG_DIR") {
            self.logging.dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("CRM_METRICS_ADDR") {
            self.metrics.addr = Some(v);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [jobs]
            report_log = "/var/log/crm_report.txt"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.jobs.report_log, PathBuf::from("/var/log/crm_report.txt"));
        assert_eq!(config.jobs.heartbeat_log, PathBuf::from(constants::HEARTBEAT_LOG));
        assert_eq!(config.api.retries, 2);
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("CRM_GRAPHQL_URL", "http://crm:8080/graphql"),
            ("CRM_PORT", "8080"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.graphql_url(), "http://crm:8080/graphql");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn bad_port_is_a_config_error() {
        let mut config = Config::default();
        let err = config
            .apply_env(|k| (k == "CRM_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, CrmError::Config(_)));
    }

    #[test]
    fn default_graphql_url_follows_the_server_port() {
        let mut config = Config::default();
        assert_eq!(config.graphql_url(), "http://localhost:8000/graphql");

        config.apply_env(|k| (k == "CRM_PORT").then(|| "9100".to_string())).unwrap();
        assert_eq!(config.graphql_url(), "http://localhost:9100/graphql");

        config.server.port = 9200;
        assert_eq!(config.graphql_url(), "http://localhost:9200/graphql");

        config.api.graphql_url = Some("http://api.internal/graphql".to_string());
        assert_eq!(config.graphql_url(), "http://api.internal/graphql");
    }
}
