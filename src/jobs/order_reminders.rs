use super::client::GraphQLClient;
use super::log_sink::append_line;
use crate::config::Config;
use crate::constants;
use crate::error::Result;
use crate::metrics::record_job_run;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{error, info, warn};

const RECENT_ORDERS_QUERY: &str = r#"
query RecentOrders($since: DateTime!) {
  allOrders(filter: { orderDateGte: $since }) {
    id
    orderDate
    customer { email }
  }
}
"#;

const ALL_ORDERS_QUERY: &str = r#"
query {
  allOrders {
    id
    orderDate
    customer { email }
  }
}
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrdersData {
    all_orders: Vec<OrderSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderSummary {
    id: String,
    order_date: String,
    customer: Option<CustomerSummary>,
}

#[derive(Debug, Deserialize)]
struct CustomerSummary {
    email: String,
}

/// Log one reminder line per order placed within the reminder window.
///
/// Re-running appends the same orders again.
pub async fn run(config: &Config) {
    let path = &config.jobs.order_reminders_log;
    let ok = match remind(config).await {
        Ok(count) => {
            info!("Logged reminders for {} recent orders", count);
            true
        }
        Err(e) => {
            error!("Order reminders failed: {}", e);
            let line = format!("{} - ERROR fetching orders: {}", timestamp(), e);
            if let Err(e) = append_line(path, &line).await {
                error!("Failed to write reminder log {}: {}", path.display(), e);
            }
            false
        }
    };
    record_job_run(constants::ORDER_REMINDERS_JOB, ok);
}

async fn remind(config: &Config) -> Result<usize> {
    let since = Utc::now() - Duration::days(config.jobs.reminder_window_days);
    let orders = fetch_orders(config, since).await?;

    let mut count = 0;
    for order in orders {
        let Some(placed) = parse_order_date(&order.order_date) else {
            warn!("Skipping order {} with unreadable date '{}'", order.id, order.order_date);
            continue;
        };
        if placed < since {
            continue;
        }
        let email = order.customer.map(|c| c.email).unwrap_or_else(|| "unknown".to_string());
        let line = format!("{} - Order ID: {}, Customer Email: {}", timestamp(), order.id, email);
        append_line(&config.jobs.order_reminders_log, &line).await?;
        count += 1;
    }
    Ok(count)
}

/// Server-side filtered fetch, falling back to every order when the
/// filtered query is refused.
async fn fetch_orders(config: &Config, since: DateTime<Utc>) -> Result<Vec<OrderSummary>> {
    let client = GraphQLClient::new(config)?;
    let variables = serde_json::json!({ "since": since.to_rfc3339() });
    match client
        .execute::<OrdersData>(RECENT_ORDERS_QUERY, Some(variables))
        .await
    {
        Ok(data) => Ok(data.all_orders),
        Err(e) => {
            warn!("Filtered order query failed, fetching all orders: {}", e);
            let data: OrdersData = client.execute(ALL_ORDERS_QUERY, None).await?;
            Ok(data.all_orders)
        }
    }
}

/// Accepts RFC 3339, a naive date-time (taken as UTC) or a bare date.
fn parse_order_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn timestamp() -> String {
    format!("{}+0000", Utc::now().format(constants::YMD_TIMESTAMP))
}
