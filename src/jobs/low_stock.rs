use super::client::GraphQLClient;
use super::log_sink::append_line;
use crate::config::Config;
use crate::constants;
use crate::error::Result;
use crate::metrics::record_job_run;
use chrono::Local;
use serde::Deserialize;
use tracing::{error, info, warn};

const RESTOCK_MUTATION: &str = r#"
mutation {
  updateLowStockProducts {
    success
    message
    updatedProducts { name stock }
  }
}
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestockData {
    update_low_stock_products: RestockPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestockPayload {
    success: bool,
    message: String,
    updated_products: Vec<RestockedProduct>,
}

#[derive(Debug, Deserialize)]
struct RestockedProduct {
    name: String,
    stock: i64,
}

/// Ask the API to restock low-stock products and log what changed.
pub async fn run(config: &Config) {
    let path = &config.jobs.low_stock_log;
    let ok = match restock(config).await {
        Ok(payload) => {
            if !payload.success {
                warn!("Restock mutation reported failure: {}", payload.message);
            }
            info!(
                "Low-stock restock updated {} products",
                payload.updated_products.len()
            );
            let mut lines = vec![format!("{} {}", timestamp(), payload.message)];
            for product in &payload.updated_products {
                lines.push(format!("{} {} => {}", timestamp(), product.name, product.stock));
            }
            write_lines(path, &lines).await
        }
        Err(e) => {
            error!("Low-stock restock failed: {}", e);
            write_lines(path, &[format!("{} ERROR updating low stock: {}", timestamp(), e)]).await;
            false
        }
    };
    record_job_run(constants::LOW_STOCK_JOB, ok);
}

async fn restock(config: &Config) -> Result<RestockPayload> {
    let client = GraphQLClient::new(config)?;
    let data: RestockData = client.execute(RESTOCK_MUTATION, None).await?;
    Ok(data.update_low_stock_products)
}

async fn write_lines(path: &std::path::Path, lines: &[String]) -> bool {
    for line in lines {
        if let Err(e) = append_line(path, line).await {
            error!("Failed to write low-stock log {}: {}", path.display(), e);
            return false;
        }
    }
    true
}

fn timestamp() -> String {
    Local::now().format(constants::DMY_TIMESTAMP).to_string()
}
