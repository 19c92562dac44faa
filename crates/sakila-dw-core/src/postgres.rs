//! Postgres implementations of the store traits.
//!
//! Id lookups bind the id list as a single `BIGINT[]` parameter
//! (`WHERE id = ANY($1)`), so a lookup is one round trip regardless of how
//! many ids it carries. Appends are chunked below the bind-parameter limit
//! and committed in one transaction.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;

use crate::db::DbPool;
use crate::error::{EtlError, Result};
use crate::model::{
    Address, City, Country, DimDate, DimMovie, DimStore, DimensionVersion, FactSale, Film,
    InventoryItem, Language, MovieKey, Payment, Rental, Staff, Store,
};
use crate::store::{SourceStore, WarehouseStore};

const BIND_LIMIT: usize = 65_535;

fn ensure_ids(table: &'static str, ids: &[i64]) -> Result<()> {
    if ids.is_empty() {
        return Err(EtlError::EmptyInClause { table });
    }
    Ok(())
}

fn rows_per_statement(columns: usize) -> usize {
    BIND_LIMIT / columns
}

#[derive(Clone)]
pub struct PgSource {
    pool: DbPool,
}

impl PgSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceStore for PgSource {
    async fn payments_after(&self, after: i64, limit: i64) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, Payment>(
            r#"
            SELECT
                payment_id::bigint AS payment_id,
                customer_id::bigint AS customer_id,
                rental_id::bigint AS rental_id,
                amount::float8 AS amount,
                payment_date::timestamp AS payment_date
            FROM payment
            WHERE payment_id > $1
            ORDER BY payment_id
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn rentals(&self, ids: &[i64]) -> Result<Vec<Rental>> {
        ensure_ids("rental", ids)?;
        let rows = sqlx::query_as::<_, Rental>(
            r#"
            SELECT rental_id::bigint AS rental_id, inventory_id::bigint AS inventory_id
            FROM rental
            WHERE rental_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn inventory(&self, ids: &[i64]) -> Result<Vec<InventoryItem>> {
        ensure_ids("inventory", ids)?;
        let rows = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT
                inventory_id::bigint AS inventory_id,
                film_id::bigint AS film_id,
                store_id::bigint AS store_id
            FROM inventory
            WHERE inventory_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn films_after(&self, after: i64, limit: i64) -> Result<Vec<Film>> {
        let rows = sqlx::query_as::<_, Film>(
            r#"
            SELECT
                film_id::bigint AS film_id,
                title,
                description,
                release_year::int4 AS release_year,
                language_id::bigint AS language_id,
                rental_duration::int4 AS rental_duration,
                length::int4 AS length,
                rating::text AS rating,
                array_to_string(special_features, ',') AS special_features
            FROM film
            WHERE film_id > $1
            ORDER BY film_id
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn languages(&self, ids: &[i64]) -> Result<Vec<Language>> {
        ensure_ids("language", ids)?;
        let rows = sqlx::query_as::<_, Language>(
            r#"
            SELECT language_id::bigint AS language_id, trim(name) AS name
            FROM language
            WHERE language_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn stores_after(&self, after: i64, limit: i64) -> Result<Vec<Store>> {
        let rows = sqlx::query_as::<_, Store>(
            r#"
            SELECT
                store_id::bigint AS store_id,
                manager_staff_id::bigint AS manager_staff_id,
                address_id::bigint AS address_id,
                last_update::timestamp AS last_update
            FROM store
            WHERE store_id > $1
            ORDER BY store_id
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn addresses(&self, ids: &[i64]) -> Result<Vec<Address>> {
        ensure_ids("address", ids)?;
        let rows = sqlx::query_as::<_, Address>(
            r#"
            SELECT
                address_id::bigint AS address_id,
                address,
                address2,
                district,
                city_id::bigint AS city_id,
                postal_code
            FROM address
            WHERE address_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn cities(&self, ids: &[i64]) -> Result<Vec<City>> {
        ensure_ids("city", ids)?;
        let rows = sqlx::query_as::<_, City>(
            r#"
            SELECT city_id::bigint AS city_id, city, country_id::bigint AS country_id
            FROM city
            WHERE city_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn countries(&self, ids: &[i64]) -> Result<Vec<Country>> {
        ensure_ids("country", ids)?;
        let rows = sqlx::query_as::<_, Country>(
            r#"
            SELECT country_id::bigint AS country_id, country
            FROM country
            WHERE country_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn staff(&self, ids: &[i64]) -> Result<Vec<Staff>> {
        ensure_ids("staff", ids)?;
        let rows = sqlx::query_as::<_, Staff>(
            r#"
            SELECT staff_id::bigint AS staff_id, first_name, last_name
            FROM staff
            WHERE staff_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[derive(Clone)]
pub struct PgWarehouse {
    pool: DbPool,
}

impl PgWarehouse {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn max_key(&self, query: &'static str) -> Result<Option<i64>> {
        let value = sqlx::query_scalar::<_, Option<i64>>(query)
            .fetch_one(&self.pool)
            .await?;
        Ok(value)
    }
}

#[async_trait]
impl WarehouseStore for PgWarehouse {
    async fn max_sales_key(&self) -> Result<Option<i64>> {
        self.max_key("SELECT MAX(sales_key)::bigint FROM fact_sales")
            .await
    }

    async fn customer_versions(&self, customer_ids: &[i64]) -> Result<Vec<DimensionVersion>> {
        ensure_ids("dim_customer", customer_ids)?;
        let rows = sqlx::query_as::<_, DimensionVersion>(
            r#"
            SELECT
                customer_key::bigint AS surrogate_key,
                customer_id::bigint AS business_key,
                start_date::timestamp AS start_date,
                end_date::timestamp AS end_date
            FROM dim_customer
            WHERE customer_id = ANY($1)
            "#,
        )
        .bind(customer_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn store_versions(&self, store_ids: &[i64]) -> Result<Vec<DimensionVersion>> {
        ensure_ids("dim_store", store_ids)?;
        let rows = sqlx::query_as::<_, DimensionVersion>(
            r#"
            SELECT
                store_key::bigint AS surrogate_key,
                store_id::bigint AS business_key,
                start_date::timestamp AS start_date,
                end_date::timestamp AS end_date
            FROM dim_store
            WHERE store_id = ANY($1)
            "#,
        )
        .bind(store_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn movies(&self, film_ids: &[i64]) -> Result<Vec<MovieKey>> {
        ensure_ids("dim_movie", film_ids)?;
        let rows = sqlx::query_as::<_, MovieKey>(
            r#"
            SELECT movie_key::bigint AS movie_key, film_id::bigint AS film_id
            FROM dim_movie
            WHERE film_id = ANY($1)
            "#,
        )
        .bind(film_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn append_sales(&self, rows: &[FactSale]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut appended = 0;

        for chunk in rows.chunks(rows_per_statement(6)) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO fact_sales (sales_key, date_key, customer_key, movie_key, store_key, sales_amount) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.sales_key)
                    .push_bind(row.date_key.clone())
                    .push_bind(row.customer_key)
                    .push_bind(row.movie_key)
                    .push_bind(row.store_key)
                    .push_bind(row.sales_amount);
            });
            appended += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        debug!(rows = appended, "Appended fact_sales rows");
        Ok(appended)
    }

    async fn max_film_id(&self) -> Result<Option<i64>> {
        self.max_key("SELECT MAX(film_id)::bigint FROM dim_movie")
            .await
    }

    async fn append_movies(&self, rows: &[DimMovie]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut appended = 0;

        for chunk in rows.chunks(rows_per_statement(9)) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO dim_movie (film_id, title, description, release_year, language, rental_duration, length, rating, special_features) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.film_id)
                    .push_bind(row.title.clone())
                    .push_bind(row.description.clone())
                    .push_bind(row.release_year)
                    .push_bind(row.language.clone())
                    .push_bind(row.rental_duration)
                    .push_bind(row.length)
                    .push_bind(row.rating.clone())
                    .push_bind(row.special_features.clone());
            });
            appended += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(appended)
    }

    async fn max_store_id(&self) -> Result<Option<i64>> {
        self.max_key("SELECT MAX(store_id)::bigint FROM dim_store")
            .await
    }

    async fn append_stores(&self, rows: &[DimStore]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut appended = 0;

        for chunk in rows.chunks(rows_per_statement(11)) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO dim_store (store_id, address, address2, district, city, country, postal_code, manager_first_name, manager_last_name, start_date, end_date) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.store_id)
                    .push_bind(row.address.clone())
                    .push_bind(row.address2.clone())
                    .push_bind(row.district.clone())
                    .push_bind(row.city.clone())
                    .push_bind(row.country.clone())
                    .push_bind(row.postal_code.clone())
                    .push_bind(row.manager_first_name.clone())
                    .push_bind(row.manager_last_name.clone())
                    .push_bind(row.start_date)
                    .push_bind(row.end_date);
            });
            appended += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(appended)
    }

    async fn latest_date(&self) -> Result<Option<NaiveDate>> {
        let value = sqlx::query_scalar::<_, Option<NaiveDate>>("SELECT MAX(date) FROM dim_date")
            .fetch_one(&self.pool)
            .await?;
        Ok(value)
    }

    async fn append_dates(&self, rows: &[DimDate]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut appended = 0;

        for chunk in rows.chunks(rows_per_statement(9)) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO dim_date (date_key, day, date, year, quarter, month, week, is_weekend, is_holiday) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.date_key.clone())
                    .push_bind(row.day)
                    .push_bind(row.date)
                    .push_bind(row.year)
                    .push_bind(row.quarter)
                    .push_bind(row.month)
                    .push_bind(row.week)
                    .push_bind(row.is_weekend)
                    .push_bind(row.is_holiday);
            });
            appended += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(appended)
    }
}
