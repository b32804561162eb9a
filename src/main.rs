use anyhow::Result;
use clap::{Parser, Subcommand};
use crm_backend::app::SeedUseCase;
use crm_backend::config::Config;
use crm_backend::jobs::{self, Scheduler};
use crm_backend::storage::{SqliteStorage, Storage};
use crm_backend::{logging, metrics, server};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "crm")]
#[command(about = "CRM backend: GraphQL API and scheduled jobs")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the GraphQL API and run scheduled jobs
    Serve {
        /// Port to listen on, overriding the config
        #[arg(short, long)]
        port: Option<u16>,
        /// Do not start the job scheduler
        #[arg(long)]
        no_scheduler: bool,
    },
    /// Run a single job once
    RunJob {
        /// Job id, see `crm jobs`
        id: String,
    },
    /// List the job table
    Jobs,
    /// Insert demo customers, products and an order
    Seed,
}

fn open_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    Ok(Arc::new(SqliteStorage::open(&config.database.path)?))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Commands::Serve { port: Some(port), .. } = &cli.command {
        config.server.port = *port;
    }
    let config = Arc::new(config);

    let _guard = logging::init_logging(&config.logging.dir);

    match cli.command {
        Commands::Serve { no_scheduler, .. } => {
            metrics::init_metrics(config.metrics.addr.as_deref());
            let storage = open_storage(&config)?;

            if no_scheduler {
                info!("Job scheduler disabled");
            } else {
                info!("Scheduled jobs will call {}", config.graphql_url());
                Scheduler::new(config.clone(), jobs::job_table())?.start();
            }

            server::start_server(storage, config).await?;
        }
        Commands::RunJob { id } => {
            jobs::run_job(&id, config).await?;
            println!("Job {} finished", id);
        }
        Commands::Jobs => {
            for job in jobs::job_table() {
                println!(
                    "{:<16} {:<14} {}",
                    job.id,
                    job.cron.unwrap_or("(manual)"),
                    job.description
                );
            }
        }
        Commands::Seed => {
            let storage = open_storage(&config)?;
            let summary = SeedUseCase::new(storage).run().await?;
            println!(
                "Seeded {} customers, {} products",
                summary.customers.len(),
                summary.products.len()
            );
            if let Some(order) = summary.order {
                println!("Created order {} totalling {}", order.id, order.total_amount);
            }
        }
    }

    Ok(())
}
