//! Incremental load of `fact_sales`.
//!
//! watermark → extract → dependency chase → temporal joins → date key and
//! projection → validation → append. Every stage consumes only the output of
//! the previous one and any failure aborts the run before the append.

use polars::prelude::DataFrame;
use tracing::{debug, info};

use crate::error::Result;
use crate::extract;
use crate::frames::{
    self, CUSTOMER_ID, CUSTOMER_KEY, FILM_ID, INVENTORY_ID, PAYMENT_DATE, RENTAL_ID, STORE_ID,
    STORE_KEY,
};
use crate::jobs::{JobKind, RunOutcome, Watermark};
use crate::model::Payment;
use crate::resolver::{self, FactLookups};
use crate::shape::{self, FACT_SALES_PROJECTION};
use crate::store::{SourceStore, WarehouseStore};
use crate::temporal::{self, Type2Join, ValidityBounds};
use crate::validation;

#[derive(Debug, Clone, Copy)]
pub struct FactSalesOptions {
    pub batch_size: i64,
    pub bounds: ValidityBounds,
}

impl Default for FactSalesOptions {
    fn default() -> Self {
        Self {
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
            bounds: ValidityBounds::default(),
        }
    }
}

pub async fn run<S, W>(source: &S, warehouse: &W, options: &FactSalesOptions) -> Result<RunOutcome>
where
    S: SourceStore + ?Sized,
    W: WarehouseStore + ?Sized,
{
    let last_key = extract::last_key(warehouse).await?;
    let payments = extract::extract_new(last_key, source, options.batch_size).await?;

    let Some(new_watermark) = payments.iter().map(|p| p.payment_id).max() else {
        info!(last_id = ?last_key, "No new record in source table");
        return Ok(RunOutcome::NoNewData {
            job: JobKind::FactSales,
            watermark: last_key.map(Watermark::Key),
        });
    };

    let lookups = resolver::resolve_fact_lookups(&payments, source, warehouse).await?;
    let shaped = transform(&payments, &lookups, options.bounds)?;
    let validated = validation::validate(payments.len(), shaped)?;
    let rows = shape::into_fact_rows(&validated)?;

    let appended = warehouse.append_sales(&rows).await?;
    info!(
        rows = appended,
        previous = ?last_key,
        watermark = new_watermark,
        "Loaded fact_sales"
    );

    Ok(RunOutcome::Loaded {
        job: JobKind::FactSales,
        rows: appended,
        previous_watermark: last_key.map(Watermark::Key),
        watermark: Watermark::Key(new_watermark),
    })
}

/// Attributes each payment to its dimension keys and shapes the result into
/// the `fact_sales` schema. Pure; no I/O.
pub fn transform(
    payments: &[Payment],
    lookups: &FactLookups,
    bounds: ValidityBounds,
) -> Result<DataFrame> {
    let frame = frames::payments_frame(payments)?;

    let customers = frames::versions_frame(&lookups.customers, CUSTOMER_ID, CUSTOMER_KEY)?;
    let frame = temporal::temporal_left_join(
        &frame,
        &customers,
        &Type2Join {
            business_key: CUSTOMER_ID,
            surrogate_key: CUSTOMER_KEY,
            timestamp: PAYMENT_DATE,
            bounds,
        },
    )?;
    debug!(rows = frame.height(), "Joined payment with dim_customer");

    let frame = temporal::left_join(&frame, &frames::rentals_frame(&lookups.rentals)?, RENTAL_ID)?;
    debug!(rows = frame.height(), "Joined payment with rental");

    let frame = temporal::left_join(
        &frame,
        &frames::inventory_frame(&lookups.inventory)?,
        INVENTORY_ID,
    )?;
    debug!(rows = frame.height(), "Joined payment with inventory");

    let frame = temporal::left_join(&frame, &frames::movies_frame(&lookups.movies)?, FILM_ID)?;
    debug!(rows = frame.height(), "Joined payment with dim_movie");

    let stores = frames::versions_frame(&lookups.stores, STORE_ID, STORE_KEY)?;
    let frame = temporal::temporal_left_join(
        &frame,
        &stores,
        &Type2Join {
            business_key: STORE_ID,
            surrogate_key: STORE_KEY,
            timestamp: PAYMENT_DATE,
            bounds,
        },
    )?;
    debug!(rows = frame.height(), "Joined payment with dim_store");

    let frame = shape::add_date_key(&frame)?;
    let frame = shape::project(&frame, &FACT_SALES_PROJECTION)?;
    Ok(frame)
}
