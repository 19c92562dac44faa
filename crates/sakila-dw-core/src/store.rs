use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{
    Address, City, Country, DimDate, DimMovie, DimStore, DimensionVersion, FactSale, Film,
    InventoryItem, Language, MovieKey, Payment, Rental, Staff, Store,
};

/// Read-only access to the operational (rental/payment) database.
///
/// Lookups by id receive a non-empty slice of distinct ids; callers are
/// expected to skip the call entirely when there is nothing to look up.
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn payments_after(&self, after: i64, limit: i64) -> Result<Vec<Payment>>;
    async fn rentals(&self, ids: &[i64]) -> Result<Vec<Rental>>;
    async fn inventory(&self, ids: &[i64]) -> Result<Vec<InventoryItem>>;

    async fn films_after(&self, after: i64, limit: i64) -> Result<Vec<Film>>;
    async fn languages(&self, ids: &[i64]) -> Result<Vec<Language>>;

    async fn stores_after(&self, after: i64, limit: i64) -> Result<Vec<Store>>;
    async fn addresses(&self, ids: &[i64]) -> Result<Vec<Address>>;
    async fn cities(&self, ids: &[i64]) -> Result<Vec<City>>;
    async fn countries(&self, ids: &[i64]) -> Result<Vec<Country>>;
    async fn staff(&self, ids: &[i64]) -> Result<Vec<Staff>>;
}

/// Read and append access to the star-schema warehouse.
///
/// Every `append_*` call is all-or-nothing.
#[async_trait]
pub trait WarehouseStore: Send + Sync {
    async fn max_sales_key(&self) -> Result<Option<i64>>;
    async fn customer_versions(&self, customer_ids: &[i64]) -> Result<Vec<DimensionVersion>>;
    async fn store_versions(&self, store_ids: &[i64]) -> Result<Vec<DimensionVersion>>;
    async fn movies(&self, film_ids: &[i64]) -> Result<Vec<MovieKey>>;
    async fn append_sales(&self, rows: &[FactSale]) -> Result<u64>;

    async fn max_film_id(&self) -> Result<Option<i64>>;
    async fn append_movies(&self, rows: &[DimMovie]) -> Result<u64>;

    async fn max_store_id(&self) -> Result<Option<i64>>;
    async fn append_stores(&self, rows: &[DimStore]) -> Result<u64>;

    async fn latest_date(&self) -> Result<Option<NaiveDate>>;
    async fn append_dates(&self, rows: &[DimDate]) -> Result<u64>;
}
