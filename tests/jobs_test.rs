use anyhow::Result;
use chrono::{Duration, Utc};
use crm_backend::app::{OrderInput, OrderUseCase, ProductInput, ProductUseCase, SeedUseCase};
use crm_backend::config::Config;
use crm_backend::jobs::{self, heartbeat, low_stock, order_reminders, report};
use crm_backend::server;
use crm_backend::storage::{SqliteStorage, Storage};
use async_graphql::ID;
use regex::Regex;
use rust_decimal::Decimal;
use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tokio::sync::oneshot;

/// A served API plus a config whose job logs live in a temp dir.
struct Harness {
    storage: Arc<dyn Storage>,
    config: Config,
    _shutdown: oneshot::Sender<()>,
    _dir: TempDir,
}

fn job_config(dir: &Path, graphql_url: String) -> Config {
    let mut config = Config::default();
    config.api.graphql_url = Some(graphql_url);
    config.api.timeout_seconds = 5;
    config.api.retries = 0;
    config.jobs.heartbeat_log = dir.join("heartbeat.log");
    config.jobs.low_stock_log = dir.join("low_stock.log");
    config.jobs.order_reminders_log = dir.join("reminders.log");
    config.jobs.report_log = dir.join("report.log");
    config
}

async fn serve_api() -> Result<Harness> {
    let storage: Arc<dyn Storage> = Arc::new(SqliteStorage::in_memory()?);
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    let (shutdown, rx) = oneshot::channel::<()>();
    tokio::spawn(server::serve(
        listener,
        storage.clone(),
        Arc::new(Config::default()),
        async {
            rx.await.ok();
        },
    ));

    let dir = tempdir()?;
    let config = job_config(dir.path(), format!("http://{}/graphql", addr));
    Ok(Harness { storage, config, _shutdown: shutdown, _dir: dir })
}

/// Config pointing at a port nothing listens on.
fn unreachable_config(dir: &Path) -> Result<Config> {
    let addr = TcpListener::bind("127.0.0.1:0")?.local_addr()?;
    Ok(job_config(dir, format!("http://{}/graphql", addr)))
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    Ok(std::fs::read_to_string(path)?.lines().map(str::to_string).collect())
}

#[tokio::test]
async fn reminders_append_on_every_run() -> Result<()> {
    let harness = serve_api().await?;
    let seeded = SeedUseCase::new(harness.storage.clone()).run().await?;
    let recent = seeded.order.map(|o| o.id).unwrap_or_default();

    // Outside the seven-day window
    let customer = &seeded.customers[1];
    OrderUseCase::new(harness.storage.clone())
        .create_order(OrderInput {
            customer_id: ID(customer.id.to_string()),
            product_ids: vec![ID(seeded.products[0].id.to_string())],
            order_date: Some(Utc::now() - Duration::days(30)),
        })
        .await?;

    order_reminders::run(&harness.config).await;
    order_reminders::run(&harness.config).await;

    let lines = read_lines(&harness.config.jobs.order_reminders_log)?;
    let pattern = Regex::new(&format!(
        r"^\d{{4}}-\d{{2}}-\d{{2}} \d{{2}}:\d{{2}}:\d{{2}}\+0000 - Order ID: {recent}, Customer Email: alice@example\.com$"
    ))?;
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert!(lines.iter().all(|line| pattern.is_match(line)), "{lines:?}");
    Ok(())
}

#[tokio::test]
async fn report_summarizes_customers_orders_and_revenue() -> Result<()> {
    let harness = serve_api().await?;
    SeedUseCase::new(harness.storage.clone()).run().await?;

    report::run(&harness.config).await;

    let lines = read_lines(&harness.config.jobs.report_log)?;
    let pattern = Regex::new(
        r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2} - Report: 2 customers, 1 orders, 1019\.98 revenue$",
    )?;
    assert_eq!(lines.len(), 1);
    assert!(pattern.is_match(&lines[0]), "{}", lines[0]);
    Ok(())
}

#[tokio::test]
async fn low_stock_logs_summary_and_each_product() -> Result<()> {
    let harness = serve_api().await?;
    let products = ProductUseCase::new(harness.storage.clone());
    for (name, stock) in [("Cable", 2), ("Laptop", 10)] {
        products
            .create_product(ProductInput {
                name: name.to_string(),
                price: Some(Decimal::new(500, 2)),
                stock: Some(stock),
            })
            .await?;
    }

    low_stock::run(&harness.config).await;

    let lines = read_lines(&harness.config.jobs.low_stock_log)?;
    let stamp = r"^\d{2}/\d{2}/\d{4}-\d{2}:\d{2}:\d{2} ";
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert!(Regex::new(&format!(r"{stamp}Updated 1 low-stock product\(s\)\.$"))?.is_match(&lines[0]));
    assert!(Regex::new(&format!(r"{stamp}Cable => 12$"))?.is_match(&lines[1]));
    Ok(())
}

#[tokio::test]
async fn heartbeat_writes_even_without_api() -> Result<()> {
    let dir = tempdir()?;
    let config = unreachable_config(dir.path())?;

    heartbeat::run(&config).await;
    heartbeat::run(&config).await;

    let lines = read_lines(&config.jobs.heartbeat_log)?;
    let pattern = Regex::new(r"^\d{2}/\d{2}/\d{4}-\d{2}:\d{2}:\d{2} CRM is alive$")?;
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| pattern.is_match(line)), "{lines:?}");
    Ok(())
}

#[tokio::test]
async fn unreachable_endpoint_yields_error_lines() -> Result<()> {
    let dir = tempdir()?;
    let config = Arc::new(unreachable_config(dir.path())?);

    for id in ["low-stock", "order-reminders", "weekly-report"] {
        jobs::run_job(id, config.clone()).await?;
    }

    let low_stock = read_lines(&config.jobs.low_stock_log)?;
    assert_eq!(low_stock.len(), 1);
    assert!(Regex::new(r"^\d{2}/\d{2}/\d{4}-\d{2}:\d{2}:\d{2} ERROR updating low stock: ")?.is_match(&low_stock[0]));

    let reminders = read_lines(&config.jobs.order_reminders_log)?;
    assert_eq!(reminders.len(), 1);
    assert!(Regex::new(r"^\S+ \S+\+0000 - ERROR fetching orders: ")?.is_match(&reminders[0]));

    let report = read_lines(&config.jobs.report_log)?;
    assert_eq!(report.len(), 1);
    assert!(Regex::new(r" - Report: ERROR generating report \(.+\)$")?.is_match(&report[0]));
    Ok(())
}
