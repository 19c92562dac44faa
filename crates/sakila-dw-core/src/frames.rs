//! Conversions from typed rows into the polars frames the fact pipeline
//! joins on. Timestamps become `Datetime(Microseconds, None)` columns.

use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::model::{DimensionVersion, InventoryItem, MovieKey, Payment, Rental};
use crate::temporal::{END_DATE, START_DATE};

pub const PAYMENT_ID: &str = "payment_id";
pub const CUSTOMER_ID: &str = "customer_id";
pub const RENTAL_ID: &str = "rental_id";
pub const AMOUNT: &str = "amount";
pub const PAYMENT_DATE: &str = "payment_date";
pub const INVENTORY_ID: &str = "inventory_id";
pub const FILM_ID: &str = "film_id";
pub const STORE_ID: &str = "store_id";
pub const CUSTOMER_KEY: &str = "customer_key";
pub const MOVIE_KEY: &str = "movie_key";
pub const STORE_KEY: &str = "store_key";

fn datetime_column(name: &str, values: Vec<Option<i64>>) -> PolarsResult<Column> {
    let series = Series::new(name.into(), values)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
    Ok(series.into())
}

fn micros(ts: &NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_micros()
}

pub fn payments_frame(payments: &[Payment]) -> PolarsResult<DataFrame> {
    let payment_ids: Vec<i64> = payments.iter().map(|p| p.payment_id).collect();
    let customer_ids: Vec<i64> = payments.iter().map(|p| p.customer_id).collect();
    let rental_ids: Vec<Option<i64>> = payments.iter().map(|p| p.rental_id).collect();
    let amounts: Vec<f64> = payments.iter().map(|p| p.amount).collect();
    let payment_dates: Vec<Option<i64>> =
        payments.iter().map(|p| Some(micros(&p.payment_date))).collect();

    DataFrame::new(vec![
        Series::new(PAYMENT_ID.into(), payment_ids).into(),
        Series::new(CUSTOMER_ID.into(), customer_ids).into(),
        Series::new(RENTAL_ID.into(), rental_ids).into(),
        Series::new(AMOUNT.into(), amounts).into(),
        datetime_column(PAYMENT_DATE, payment_dates)?,
    ])
}

pub fn rentals_frame(rentals: &[Rental]) -> PolarsResult<DataFrame> {
    let rental_ids: Vec<i64> = rentals.iter().map(|r| r.rental_id).collect();
    let inventory_ids: Vec<Option<i64>> = rentals.iter().map(|r| r.inventory_id).collect();

    DataFrame::new(vec![
        Series::new(RENTAL_ID.into(), rental_ids).into(),
        Series::new(INVENTORY_ID.into(), inventory_ids).into(),
    ])
}

pub fn inventory_frame(items: &[InventoryItem]) -> PolarsResult<DataFrame> {
    let inventory_ids: Vec<i64> = items.iter().map(|i| i.inventory_id).collect();
    let film_ids: Vec<Option<i64>> = items.iter().map(|i| i.film_id).collect();
    let store_ids: Vec<Option<i64>> = items.iter().map(|i| i.store_id).collect();

    DataFrame::new(vec![
        Series::new(INVENTORY_ID.into(), inventory_ids).into(),
        Series::new(FILM_ID.into(), film_ids).into(),
        Series::new(STORE_ID.into(), store_ids).into(),
    ])
}

pub fn movies_frame(movies: &[MovieKey]) -> PolarsResult<DataFrame> {
    let film_ids: Vec<i64> = movies.iter().map(|m| m.film_id).collect();
    let movie_keys: Vec<i64> = movies.iter().map(|m| m.movie_key).collect();

    DataFrame::new(vec![
        Series::new(FILM_ID.into(), film_ids).into(),
        Series::new(MOVIE_KEY.into(), movie_keys).into(),
    ])
}

/// Builds the frame of all versions of a type-2 dimension, naming the key
/// columns after the dimension (`customer_id`/`customer_key`, ...).
pub fn versions_frame(
    versions: &[DimensionVersion],
    business_key: &str,
    surrogate_key: &str,
) -> PolarsResult<DataFrame> {
    let business_keys: Vec<i64> = versions.iter().map(|v| v.business_key).collect();
    let surrogate_keys: Vec<i64> = versions.iter().map(|v| v.surrogate_key).collect();
    let starts: Vec<Option<i64>> = versions.iter().map(|v| Some(micros(&v.start_date))).collect();
    let ends: Vec<Option<i64>> = versions
        .iter()
        .map(|v| v.end_date.as_ref().map(micros))
        .collect();

    DataFrame::new(vec![
        Series::new(business_key.into(), business_keys).into(),
        Series::new(surrogate_key.into(), surrogate_keys).into(),
        datetime_column(START_DATE, starts)?,
        datetime_column(END_DATE, ends)?,
    ])
}
