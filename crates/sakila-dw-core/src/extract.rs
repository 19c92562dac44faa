//! Watermark reads and incremental extraction of new `payment` rows.

use tracing::{debug, info};

use crate::error::Result;
use crate::model::Payment;
use crate::store::{SourceStore, WarehouseStore};

/// Lower bound used when the target table has never been loaded.
pub const EMPTY_WATERMARK: i64 = -1;

/// Highest `sales_key` already in `fact_sales`, or `None` before the first load.
pub async fn last_key<W>(warehouse: &W) -> Result<Option<i64>>
where
    W: WarehouseStore + ?Sized,
{
    let last = warehouse.max_sales_key().await?;
    debug!(last_id = ?last, "Read fact_sales watermark");
    Ok(last)
}

/// Payments with `payment_id > last_key`, in key order, at most `batch_size`.
///
/// A backlog larger than one batch drains over several runs.
pub async fn extract_new<S>(
    last_key: Option<i64>,
    source: &S,
    batch_size: i64,
) -> Result<Vec<Payment>>
where
    S: SourceStore + ?Sized,
{
    let after = last_key.unwrap_or(EMPTY_WATERMARK);
    let payments = source.payments_after(after, batch_size).await?;
    info!(
        after,
        batch_size,
        rows = payments.len(),
        "Extracted new payment rows"
    );
    Ok(payments)
}
