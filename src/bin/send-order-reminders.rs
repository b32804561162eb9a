use anyhow::Result;
use clap::Parser;
use crm_backend::config::Config;
use crm_backend::{constants, jobs, logging};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "send-order-reminders")]
#[command(about = "Log reminders for orders placed in the last week")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = Arc::new(Config::load(cli.config.as_deref())?);
    let _guard = logging::init_logging(&config.logging.dir);

    jobs::run_job(constants::ORDER_REMINDERS_JOB, config).await?;
    println!("Order reminders processed!");
    Ok(())
}
