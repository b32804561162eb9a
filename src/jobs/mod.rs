//! Background jobs that report on and maintain the CRM through its own
//! GraphQL API.

pub mod client;
pub mod heartbeat;
pub mod log_sink;
pub mod low_stock;
pub mod order_reminders;
pub mod report;
pub mod schedule;
pub mod scheduler;

use crate::config::Config;
use crate::constants;
use crate::error::{CrmError, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use client::GraphQLClient;
pub use schedule::CronSchedule;
pub use scheduler::Scheduler;

pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type JobHandler = fn(Arc<Config>) -> JobFuture;

#[derive(Clone, Copy)]
pub struct JobSpec {
    pub id: &'static str,
    /// `None` for jobs that only run when triggered externally
    pub cron: Option<&'static str>,
    pub description: &'static str,
    pub handler: JobHandler,
}

impl std::fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSpec")
            .field("id", &self.id)
            .field("cron", &self.cron)
            .finish()
    }
}

pub fn job_table() -> Vec<JobSpec> {
    vec![
        JobSpec {
            id: constants::HEARTBEAT_JOB,
            cron: Some(constants::HEARTBEAT_CRON),
            description: "Append a liveness line and ping the GraphQL endpoint",
            handler: |config| Box::pin(async move { heartbeat::run(&config).await }),
        },
        JobSpec {
            id: constants::LOW_STOCK_JOB,
            cron: Some(constants::LOW_STOCK_CRON),
            description: "Restock products below the stock threshold",
            handler: |config| Box::pin(async move { low_stock::run(&config).await }),
        },
        JobSpec {
            id: constants::ORDER_REMINDERS_JOB,
            cron: None,
            description: "Log reminders for orders from the last week",
            handler: |config| Box::pin(async move { order_reminders::run(&config).await }),
        },
        JobSpec {
            id: constants::WEEKLY_REPORT_JOB,
            cron: Some(constants::WEEKLY_REPORT_CRON),
            description: "Log customer, order and revenue totals",
            handler: |config| Box::pin(async move { report::run(&config).await }),
        },
    ]
}

pub fn find_job(id: &str) -> Option<JobSpec> {
    job_table().into_iter().find(|job| job.id == id)
}

/// Run one job to completion. Job failures end up in the job's own log;
/// only an unknown id is an error here.
pub async fn run_job(id: &str, config: Arc<Config>) -> Result<()> {
    let job = find_job(id).ok_or_else(|| {
        CrmError::Config(format!(
            "unknown job '{}' (known: {})",
            id,
            constants::get_job_ids().join(", ")
        ))
    })?;
    (job.handler)(config).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_job_id() {
        let ids: Vec<&str> = job_table().iter().map(|job| job.id).collect();
        assert_eq!(ids, constants::get_job_ids());
    }

    #[test]
    fn every_cron_expression_parses() {
        for job in job_table() {
            if let Some(expr) = job.cron {
                assert!(CronSchedule::parse(expr).is_ok(), "{} has a bad schedule", job.id);
            }
        }
        assert!(find_job(constants::ORDER_REMINDERS_JOB).unwrap().cron.is_none());
    }

    #[tokio::test]
    async fn unknown_job_is_rejected() {
        let err = run_job("nope", Arc::new(Config::default())).await.unwrap_err();
        assert!(matches!(err, CrmError::Config(_)));
    }
}
