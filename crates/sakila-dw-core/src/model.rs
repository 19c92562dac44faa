//! Row types exchanged with the source database and the warehouse.
//!
//! Identifiers are widened to `i64` at the SQL boundary so that join keys
//! line up regardless of the integer width used by either schema.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::FromRow;

/// A `payment` row. Immutable once written upstream.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Payment {
    pub payment_id: i64,
    pub customer_id: i64,
    pub rental_id: Option<i64>,
    pub amount: f64,
    pub payment_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Rental {
    pub rental_id: i64,
    pub inventory_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct InventoryItem {
    pub inventory_id: i64,
    pub film_id: Option<i64>,
    pub store_id: Option<i64>,
}

/// One version of a type-2 dimension row (`dim_customer`, `dim_store`).
///
/// The version is valid from `start_date` until `end_date`; a missing
/// `end_date` marks the currently active version.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DimensionVersion {
    pub surrogate_key: i64,
    pub business_key: i64,
    pub start_date: NaiveDateTime,
    pub end_date: Option<NaiveDateTime>,
}

/// Key pair of the type-1 `dim_movie` dimension.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MovieKey {
    pub movie_key: i64,
    pub film_id: i64,
}

/// A row of `fact_sales`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactSale {
    pub sales_key: i64,
    pub date_key: String,
    pub customer_key: i64,
    pub movie_key: Option<i64>,
    pub store_key: Option<i64>,
    pub sales_amount: f64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Film {
    pub film_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub release_year: Option<i32>,
    pub language_id: Option<i64>,
    pub rental_duration: Option<i32>,
    pub length: Option<i32>,
    pub rating: Option<String>,
    pub special_features: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Language {
    pub language_id: i64,
    pub name: String,
}

/// A row of `dim_movie` as produced by the movie loader.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimMovie {
    pub film_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub release_year: Option<i32>,
    pub language: Option<String>,
    pub rental_duration: Option<i32>,
    pub length: Option<i32>,
    pub rating: Option<String>,
    pub special_features: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Store {
    pub store_id: i64,
    pub manager_staff_id: Option<i64>,
    pub address_id: Option<i64>,
    pub last_update: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Address {
    pub address_id: i64,
    pub address: String,
    pub address2: Option<String>,
    pub district: Option<String>,
    pub city_id: Option<i64>,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct City {
    pub city_id: i64,
    pub city: String,
    pub country_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Country {
    pub country_id: i64,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Staff {
    pub staff_id: i64,
    pub first_name: String,
    pub last_name: String,
}

/// A row of `dim_store`. New stores open their first validity interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimStore {
    pub store_id: i64,
    pub address: Option<String>,
    pub address2: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub manager_first_name: Option<String>,
    pub manager_last_name: Option<String>,
    pub start_date: NaiveDateTime,
    pub end_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimDate {
    pub date_key: String,
    pub date: NaiveDate,
    pub day: i32,
    pub week: i32,
    pub month: i32,
    pub quarter: i32,
    pub year: i32,
    pub is_weekend: bool,
    pub is_holiday: bool,
}
