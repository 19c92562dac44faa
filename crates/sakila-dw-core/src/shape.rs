use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::error::{EtlError, Result};
use crate::frames::{AMOUNT, CUSTOMER_KEY, MOVIE_KEY, PAYMENT_DATE, PAYMENT_ID, STORE_KEY};
use crate::model::FactSale;

pub const SALES_KEY: &str = "sales_key";
pub const DATE_KEY: &str = "date_key";
pub const SALES_AMOUNT: &str = "sales_amount";

const DATE_KEY_FORMAT: &str = "%Y%m%d";

/// `(source column, target column)` pairs of the `fact_sales` schema, in
/// target column order.
pub const FACT_SALES_PROJECTION: [(&str, &str); 6] = [
    (PAYMENT_ID, SALES_KEY),
    (DATE_KEY, DATE_KEY),
    (CUSTOMER_KEY, CUSTOMER_KEY),
    (MOVIE_KEY, MOVIE_KEY),
    (STORE_KEY, STORE_KEY),
    (AMOUNT, SALES_AMOUNT),
];

/// Smart date key: `2020-07-04 10:00:00` becomes `"20200704"`.
pub fn derive_date_key(timestamp: NaiveDateTime) -> String {
    timestamp.format(DATE_KEY_FORMAT).to_string()
}

pub fn add_date_key(frame: &DataFrame) -> PolarsResult<DataFrame> {
    frame
        .clone()
        .lazy()
        .with_column(
            col(PAYMENT_DATE)
                .dt()
                .strftime(DATE_KEY_FORMAT)
                .alias(DATE_KEY),
        )
        .collect()
}

/// Selects and renames `projection` columns; everything else is dropped.
pub fn project(frame: &DataFrame, projection: &[(&str, &str)]) -> PolarsResult<DataFrame> {
    let columns: Vec<Expr> = projection
        .iter()
        .map(|(source, target)| col(*source).alias(*target))
        .collect();
    frame.clone().lazy().select(columns).collect()
}

/// Reads a validated `fact_sales` frame back into typed rows.
pub fn into_fact_rows(frame: &DataFrame) -> Result<Vec<FactSale>> {
    let sales_keys = frame.column(SALES_KEY)?.i64()?;
    let date_keys = frame.column(DATE_KEY)?.str()?;
    let customer_keys = frame.column(CUSTOMER_KEY)?.i64()?;
    let movie_keys = frame.column(MOVIE_KEY)?.i64()?;
    let store_keys = frame.column(STORE_KEY)?.i64()?;
    let amounts = frame.column(SALES_AMOUNT)?.f64()?;

    let mut rows = Vec::with_capacity(frame.height());
    for idx in 0..frame.height() {
        let (Some(sales_key), Some(date_key), Some(customer_key), Some(sales_amount)) = (
            sales_keys.get(idx),
            date_keys.get(idx),
            customer_keys.get(idx),
            amounts.get(idx),
        ) else {
            return Err(EtlError::MandatoryKeyNull {
                column: missing_column(
                    sales_keys.get(idx).is_none(),
                    date_keys.get(idx).is_none(),
                    customer_keys.get(idx).is_none(),
                ),
                rows: 1,
            });
        };

        rows.push(FactSale {
            sales_key,
            date_key: date_key.to_string(),
            customer_key,
            movie_key: movie_keys.get(idx),
            store_key: store_keys.get(idx),
            sales_amount,
        });
    }

    Ok(rows)
}

fn missing_column(sales_key: bool, date_key: bool, customer_key: bool) -> &'static str {
    if sales_key {
        SALES_KEY
    } else if date_key {
        DATE_KEY
    } else if customer_key {
        CUSTOMER_KEY
    } else {
        SALES_AMOUNT
    }
}
