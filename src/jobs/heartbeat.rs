use super::client::GraphQLClient;
use super::log_sink::append_line;
use crate::config::Config;
use crate::constants;
use crate::metrics::record_job_run;
use chrono::Local;
use serde::Deserialize;
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
struct HelloData {
    hello: String,
}

/// Record that the process is alive, then ping the API.
///
/// The ping only feeds tracing; an unreachable endpoint does not fail the
/// heartbeat.
pub async fn run(config: &Config) {
    let line = format!("{} CRM is alive", Local::now().format(constants::DMY_TIMESTAMP));
    let written = append_line(&config.jobs.heartbeat_log, &line).await;
    if let Err(e) = &written {
        error!("Failed to write heartbeat log {}: {}", config.jobs.heartbeat_log.display(), e);
    }

    match ping(config).await {
        Ok(greeting) => info!("GraphQL endpoint responded: {}", greeting),
        Err(e) => warn!("GraphQL hello ping failed: {}", e),
    }

    record_job_run(constants::HEARTBEAT_JOB, written.is_ok());
}

async fn ping(config: &Config) -> crate::error::Result<String> {
    let client = GraphQLClient::new(config)?;
    let data: HelloData = client.execute("query { hello }", None).await?;
    Ok(data.hello)
}
