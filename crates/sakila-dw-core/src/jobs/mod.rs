//! Incremental warehouse jobs and the runner that binds them to Postgres.

pub mod dim_date;
pub mod dim_movie;
pub mod dim_store;
pub mod fact_sales;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::EtlConfig;
use crate::db::{Connections, RunLock};
use crate::error::Result;
use crate::postgres::{PgSource, PgWarehouse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    FactSales,
    DimMovie,
    DimStore,
    DimDate,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::FactSales => "fact_sales",
            JobKind::DimMovie => "dim_movie",
            JobKind::DimStore => "dim_store",
            JobKind::DimDate => "dim_date",
        }
    }

    /// Advisory lock key; one per job so different jobs may run side by side.
    pub fn lock_key(&self) -> i64 {
        const BASE: i64 = 0x534B_4457_0000; // "SKDW"
        match self {
            JobKind::FactSales => BASE + 1,
            JobKind::DimMovie => BASE + 2,
            JobKind::DimStore => BASE + 3,
            JobKind::DimDate => BASE + 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Watermark {
    Key(i64),
    Date(NaiveDate),
}

/// How a job run ended. Both variants are successful runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    NoNewData {
        job: JobKind,
        watermark: Option<Watermark>,
    },
    Loaded {
        job: JobKind,
        rows: u64,
        previous_watermark: Option<Watermark>,
        watermark: Watermark,
    },
}

impl RunOutcome {
    pub fn rows_loaded(&self) -> u64 {
        match self {
            RunOutcome::NoNewData { .. } => 0,
            RunOutcome::Loaded { rows, .. } => *rows,
        }
    }
}

/// Runs one job against Postgres while holding that job's run lock.
pub async fn run_job(kind: JobKind, config: &EtlConfig, connections: &Connections) -> Result<RunOutcome> {
    let lock = RunLock::acquire(&connections.warehouse, kind.lock_key()).await?;
    info!(job = kind.as_str(), "Acquired run lock");

    let source = PgSource::new(connections.source.clone());
    let warehouse = PgWarehouse::new(connections.warehouse.clone());

    let result = match kind {
        JobKind::FactSales => {
            let options = fact_sales::FactSalesOptions {
                batch_size: config.batch_size,
                bounds: config.validity_bounds,
            };
            fact_sales::run(&source, &warehouse, &options).await
        }
        JobKind::DimMovie => dim_movie::run(&source, &warehouse, config.batch_size).await,
        JobKind::DimStore => dim_store::run(&source, &warehouse, config.batch_size).await,
        JobKind::DimDate => dim_date::run(&warehouse, &config.date_dimension).await,
    };

    let released = lock.release().await;
    settle_run(kind, result, released)
}

/// A failed job keeps its own error even when the unlock also fails.
fn settle_run(
    kind: JobKind,
    result: Result<RunOutcome>,
    released: Result<()>,
) -> Result<RunOutcome> {
    match (result, released) {
        (Ok(outcome), Ok(())) => Ok(outcome),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(unlock_err)) => {
            warn!(job = kind.as_str(), "failed to release run lock: {unlock_err}");
            Err(err)
        }
    }
}
