use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use sakila_dw_core::config::EtlConfig;
use sakila_dw_core::db::{self, Connections};
use sakila_dw_core::jobs::{self, JobKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Incremental loads for the Sakila star-schema warehouse", long_about = None)]
struct Cli {
    /// TOML config file; defaults to SAKILA_DW_* environment variables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Append new payments to fact_sales
    FactSales(BatchArgs),
    /// Append new films to dim_movie
    DimMovie(BatchArgs),
    /// Append new stores to dim_store
    DimStore(BatchArgs),
    /// Extend dim_date up to the configured end date
    DimDate(DimDateArgs),
    /// Apply the warehouse schema migrations
    Migrate,
}

#[derive(Args, Debug, Default)]
struct BatchArgs {
    /// Maximum number of source rows extracted in one run
    #[arg(long)]
    batch_size: Option<i64>,
}

#[derive(Args, Debug, Default)]
struct DimDateArgs {
    /// First date generated when dim_date is empty (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Last date generated (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    let kind = match cli.command {
        Command::Migrate => return handle_migrate(&config).await,
        Command::FactSales(args) => {
            apply_batch_args(&mut config, &args)?;
            JobKind::FactSales
        }
        Command::DimMovie(args) => {
            apply_batch_args(&mut config, &args)?;
            JobKind::DimMovie
        }
        Command::DimStore(args) => {
            apply_batch_args(&mut config, &args)?;
            JobKind::DimStore
        }
        Command::DimDate(args) => {
            if let Some(start) = args.start {
                config.date_dimension.start = start;
            }
            if let Some(end) = args.end {
                config.date_dimension.end = end;
            }
            JobKind::DimDate
        }
    };

    handle_job(kind, &config).await
}

fn load_config(path: Option<&PathBuf>) -> Result<EtlConfig> {
    dotenvy::dotenv().ok();
    match path {
        Some(path) => EtlConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => EtlConfig::from_env().context("failed to load config from environment"),
    }
}

fn apply_batch_args(config: &mut EtlConfig, args: &BatchArgs) -> Result<()> {
    if let Some(batch_size) = args.batch_size {
        anyhow::ensure!(batch_size > 0, "--batch-size must be positive");
        config.batch_size = batch_size;
    }
    Ok(())
}

async fn handle_job(kind: JobKind, config: &EtlConfig) -> Result<()> {
    let connections = Connections::open(config).await?;
    let result = jobs::run_job(kind, config, &connections).await;
    connections.close().await;

    let outcome = result.with_context(|| format!("{} run failed", kind.as_str()))?;
    info!(job = kind.as_str(), rows = outcome.rows_loaded(), "Run finished");
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

async fn handle_migrate(config: &EtlConfig) -> Result<()> {
    let pool = db::connect(
        "warehouse",
        &config.warehouse_database_url,
        config.max_connections,
    )
    .await?;
    let result = db::run_migrations(&pool).await;
    pool.close().await;
    result.context("failed to apply warehouse migrations")?;
    info!("Warehouse migrations applied");
    Ok(())
}
