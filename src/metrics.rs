use std::net::SocketAddr;
use tracing::{info, warn};

pub const MUTATIONS_TOTAL: &str = "crm_mutations_total";
pub const JOB_RUNS_TOTAL: &str = "crm_job_runs_total";

/// Install the Prometheus exporter on `addr` when one is configured.
pub fn init_metrics(addr: Option<&str>) {
    let Some(addr) = addr else {
        info!("Metrics exporter disabled (no metrics.addr configured)");
        return;
    };
    let addr: SocketAddr = match addr.parse() {
        Ok(a) => a,
        Err(e) => {
            warn!("Invalid metrics address '{}': {}", addr, e);
            return;
        }
    };
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed (possibly already installed): {}", e),
    }
}

/// Count one mutation call by name and outcome (`ok` or `rejected`).
pub fn record_mutation(mutation: &'static str, accepted: bool) {
    let outcome = if accepted { "ok" } else { "rejected" };
    ::metrics::counter!(MUTATIONS_TOTAL, "mutation" => mutation, "outcome" => outcome).increment(1);
}

/// Count one scheduled job run by id and outcome (`ok` or `error`).
pub fn record_job_run(job: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    ::metrics::counter!(JOB_RUNS_TOTAL, "job" => job, "outcome" => outcome).increment(1);
}
