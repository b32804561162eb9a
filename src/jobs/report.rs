use super::client::GraphQLClient;
use super::log_sink::append_line;
use crate::config::Config;
use crate::constants;
use crate::error::{CrmError, Result};
use crate::metrics::record_job_run;
use chrono::Local;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{error, info};

const REPORT_QUERY: &str = r#"
query {
  allCustomers { id }
  allOrders { id totalAmount }
}
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportData {
    all_customers: Vec<serde_json::Value>,
    all_orders: Vec<ReportOrder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportOrder {
    total_amount: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub customers: usize,
    pub orders: usize,
    pub revenue: Decimal,
}

/// Summarize customers, orders and revenue into the report log.
pub async fn run(config: &Config) {
    let path = &config.jobs.report_log;
    let ts = Local::now().format(constants::YMD_TIMESTAMP).to_string();
    let (line, ok) = match generate(config).await {
        Ok(report) => {
            info!(
                "Weekly report: {} customers, {} orders, {} revenue",
                report.customers, report.orders, report.revenue
            );
            (
                format!(
                    "{} - Report: {} customers, {} orders, {:.2} revenue",
                    ts, report.customers, report.orders, report.revenue
                ),
                true,
            )
        }
        Err(e) => {
            error!("Weekly report failed: {}", e);
            (format!("{} - Report: ERROR generating report ({})", ts, e), false)
        }
    };
    let written = append_line(path, &line).await;
    if let Err(e) = &written {
        error!("Failed to write report log {}: {}", path.display(), e);
    }
    record_job_run(constants::WEEKLY_REPORT_JOB, ok && written.is_ok());
}

async fn generate(config: &Config) -> Result<Report> {
    let client = GraphQLClient::new(config)?;
    let data: ReportData = client.execute(REPORT_QUERY, None).await?;
    let mut revenue = Decimal::ZERO;
    for order in &data.all_orders {
        if let Some(value) = &order.total_amount {
            revenue += parse_amount(value)?;
        }
    }
    Ok(Report {
        customers: data.all_customers.len(),
        orders: data.all_orders.len(),
        revenue,
    })
}

/// Amounts arrive as decimal strings, but plain JSON numbers are accepted too.
fn parse_amount(value: &serde_json::Value) -> Result<Decimal> {
    let parsed = match value {
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        serde_json::Value::Null => Some(Decimal::ZERO),
        _ => None,
    };
    parsed.ok_or_else(|| CrmError::InvalidAmount(value.to_string()))
}
