use super::{CronSchedule, JobSpec};
use crate::config::Config;
use crate::error::Result;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const NO_RUN_RETRY: Duration = Duration::from_secs(60 * 60);

/// Runs every job with a cron expression on its own tokio task.
pub struct Scheduler {
    config: Arc<Config>,
    jobs: Vec<(JobSpec, CronSchedule)>,
}

impl Scheduler {
    /// Jobs without a schedule are skipped; an unparsable schedule is an error.
    pub fn new(config: Arc<Config>, jobs: Vec<JobSpec>) -> Result<Self> {
        let mut scheduled = Vec::new();
        for job in jobs {
            if let Some(expr) = job.cron {
                scheduled.push((job, CronSchedule::parse(expr)?));
            }
        }
        Ok(Self { config, jobs: scheduled })
    }

    pub fn start(self) -> Vec<JoinHandle<()>> {
        self.jobs
            .into_iter()
            .map(|(job, schedule)| {
                info!("Scheduling job {} ({})", job.id, schedule.expr());
                tokio::spawn(run_on_schedule(job, schedule, self.config.clone()))
            })
            .collect()
    }
}

async fn run_on_schedule(job: JobSpec, schedule: CronSchedule, config: Arc<Config>) {
    loop {
        let now = Local::now();
        let Some(next) = schedule.next_after(&now) else {
            warn!(
                "Job {} has no upcoming run for '{}', checking again in an hour",
                job.id,
                schedule.expr()
            );
            tokio::time::sleep(NO_RUN_RETRY).await;
            continue;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        info!("Running scheduled job {}", job.id);
        (job.handler)(config.clone()).await;
    }
}
