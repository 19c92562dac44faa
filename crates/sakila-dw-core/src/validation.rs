// crates/sakila-dw-core/src/validation.rs

use std::collections::HashSet;

use polars::prelude::DataFrame;
use tracing::debug;

use crate::error::{EtlError, Result};
use crate::frames::CUSTOMER_KEY;

/// Every join in a job preserves cardinality, so the transformed batch must
/// have exactly as many rows as were extracted.
pub fn validate_row_count(source_rows: usize, destination_rows: usize) -> Result<()> {
    if source_rows != destination_rows {
        return Err(EtlError::RowCountMismatch {
            source_rows,
            destination_rows,
        });
    }
    Ok(())
}

/// Dimension batches append one row per business key; a repeated key would
/// open a second current version of the same entity.
pub fn validate_unique_keys<I>(table: &'static str, keys: I) -> Result<()>
where
    I: IntoIterator<Item = i64>,
{
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(EtlError::DuplicateKey { table, key });
        }
    }
    Ok(())
}

/// Final gate before `fact_sales` is appended.
///
/// Movie and store attribution may be missing; customer attribution may not.
pub fn validate(source_rows: usize, result: DataFrame) -> Result<DataFrame> {
    validate_row_count(source_rows, result.height())?;

    let null_customers = result.column(CUSTOMER_KEY)?.null_count();
    if null_customers > 0 {
        return Err(EtlError::MandatoryKeyNull {
            column: CUSTOMER_KEY,
            rows: null_customers,
        });
    }

    debug!(rows = result.height(), "Transformation result is valid");
    Ok(result)
}
