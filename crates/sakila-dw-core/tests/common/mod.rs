#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sakila_dw_core::error::Result;
use sakila_dw_core::model::{
    Address, City, Country, DimDate, DimMovie, DimStore, DimensionVersion, FactSale, Film,
    InventoryItem, Language, MovieKey, Payment, Rental, Staff, Store,
};
use sakila_dw_core::store::{SourceStore, WarehouseStore};

pub fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

pub fn payment(
    payment_id: i64,
    customer_id: i64,
    rental_id: Option<i64>,
    payment_date: NaiveDateTime,
) -> Payment {
    Payment {
        payment_id,
        customer_id,
        rental_id,
        amount: 4.99,
        payment_date,
    }
}

pub fn version(
    surrogate_key: i64,
    business_key: i64,
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
) -> DimensionVersion {
    DimensionVersion {
        surrogate_key,
        business_key,
        start_date: start,
        end_date: end,
    }
}

fn by_ids<T: Clone>(rows: &[T], ids: &[i64], id: impl Fn(&T) -> i64) -> Vec<T> {
    let wanted: HashSet<i64> = ids.iter().copied().collect();
    rows.iter().filter(|row| wanted.contains(&id(row))).cloned().collect()
}

/// Source database held in memory. Records the table behind every id lookup.
#[derive(Default)]
pub struct MemorySource {
    pub payments: Mutex<Vec<Payment>>,
    pub rentals: Vec<Rental>,
    pub inventory: Vec<InventoryItem>,
    pub films: Vec<Film>,
    pub languages: Vec<Language>,
    pub stores: Vec<Store>,
    pub addresses: Vec<Address>,
    pub cities: Vec<City>,
    pub countries: Vec<Country>,
    pub staff: Vec<Staff>,
    pub queried: Mutex<Vec<&'static str>>,
}

impl MemorySource {
    pub fn push_payments(&self, rows: impl IntoIterator<Item = Payment>) {
        self.payments.lock().unwrap().extend(rows);
    }

    pub fn queried(&self) -> Vec<&'static str> {
        self.queried.lock().unwrap().clone()
    }

    fn record(&self, table: &'static str, ids: &[i64]) {
        assert!(!ids.is_empty(), "lookup against {table} sent with no ids");
        self.queried.lock().unwrap().push(table);
    }
}

#[async_trait]
impl SourceStore for MemorySource {
    async fn payments_after(&self, after: i64, limit: i64) -> Result<Vec<Payment>> {
        let mut rows: Vec<Payment> = self
            .payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.payment_id > after)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.payment_id);
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn rentals(&self, ids: &[i64]) -> Result<Vec<Rental>> {
        self.record("rental", ids);
        Ok(by_ids(&self.rentals, ids, |r| r.rental_id))
    }

    async fn inventory(&self, ids: &[i64]) -> Result<Vec<InventoryItem>> {
        self.record("inventory", ids);
        Ok(by_ids(&self.inventory, ids, |i| i.inventory_id))
    }

    async fn films_after(&self, after: i64, limit: i64) -> Result<Vec<Film>> {
        let mut rows: Vec<Film> = self
            .films
            .iter()
            .filter(|f| f.film_id > after)
            .cloned()
            .collect();
        rows.sort_by_key(|f| f.film_id);
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn languages(&self, ids: &[i64]) -> Result<Vec<Language>> {
        self.record("language", ids);
        Ok(by_ids(&self.languages, ids, |l| l.language_id))
    }

    async fn stores_after(&self, after: i64, limit: i64) -> Result<Vec<Store>> {
        let mut rows: Vec<Store> = self
            .stores
            .iter()
            .filter(|s| s.store_id > after)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.store_id);
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn addresses(&self, ids: &[i64]) -> Result<Vec<Address>> {
        self.record("address", ids);
        Ok(by_ids(&self.addresses, ids, |a| a.address_id))
    }

    async fn cities(&self, ids: &[i64]) -> Result<Vec<City>> {
        self.record("city", ids);
        Ok(by_ids(&self.cities, ids, |c| c.city_id))
    }

    async fn countries(&self, ids: &[i64]) -> Result<Vec<Country>> {
        self.record("country", ids);
        Ok(by_ids(&self.countries, ids, |c| c.country_id))
    }

    async fn staff(&self, ids: &[i64]) -> Result<Vec<Staff>> {
        self.record("staff", ids);
        Ok(by_ids(&self.staff, ids, |s| s.staff_id))
    }
}

/// Warehouse held in memory.
#[derive(Default)]
pub struct MemoryWarehouse {
    pub customers: Vec<DimensionVersion>,
    pub store_versions: Vec<DimensionVersion>,
    pub movie_keys: Vec<MovieKey>,
    pub sales: Mutex<Vec<FactSale>>,
    pub movies: Mutex<Vec<DimMovie>>,
    pub stores: Mutex<Vec<DimStore>>,
    pub dates: Mutex<Vec<DimDate>>,
    pub queried: Mutex<Vec<&'static str>>,
}

impl MemoryWarehouse {
    pub fn sales(&self) -> Vec<FactSale> {
        self.sales.lock().unwrap().clone()
    }

    pub fn queried(&self) -> Vec<&'static str> {
        self.queried.lock().unwrap().clone()
    }

    fn record(&self, table: &'static str, ids: &[i64]) {
        assert!(!ids.is_empty(), "lookup against {table} sent with no ids");
        self.queried.lock().unwrap().push(table);
    }
}

#[async_trait]
impl WarehouseStore for MemoryWarehouse {
    async fn max_sales_key(&self) -> Result<Option<i64>> {
        Ok(self.sales.lock().unwrap().iter().map(|s| s.sales_key).max())
    }

    async fn customer_versions(&self, customer_ids: &[i64]) -> Result<Vec<DimensionVersion>> {
        self.record("dim_customer", customer_ids);
        Ok(by_ids(&self.customers, customer_ids, |v| v.business_key))
    }

    async fn store_versions(&self, store_ids: &[i64]) -> Result<Vec<DimensionVersion>> {
        self.record("dim_store", store_ids);
        Ok(by_ids(&self.store_versions, store_ids, |v| v.business_key))
    }

    async fn movies(&self, film_ids: &[i64]) -> Result<Vec<MovieKey>> {
        self.record("dim_movie", film_ids);
        Ok(by_ids(&self.movie_keys, film_ids, |m| m.film_id))
    }

    async fn append_sales(&self, rows: &[FactSale]) -> Result<u64> {
        self.sales.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn max_film_id(&self) -> Result<Option<i64>> {
        Ok(self.movies.lock().unwrap().iter().map(|m| m.film_id).max())
    }

    async fn append_movies(&self, rows: &[DimMovie]) -> Result<u64> {
        self.movies.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn max_store_id(&self) -> Result<Option<i64>> {
        Ok(self.stores.lock().unwrap().iter().map(|s| s.store_id).max())
    }

    async fn append_stores(&self, rows: &[DimStore]) -> Result<u64> {
        self.stores.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn latest_date(&self) -> Result<Option<NaiveDate>> {
        Ok(self.dates.lock().unwrap().iter().map(|d| d.date).max())
    }

    async fn append_dates(&self, rows: &[DimDate]) -> Result<u64> {
        self.dates.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
}
