//! Dependency chase for the fact-sales batch.
//!
//! Starting from the extracted payments, the resolver walks
//! payment → rental → inventory → film/store and fetches only the rows the
//! batch references, one bulk lookup per table. A lookup whose id set is
//! empty is skipped without touching the database.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::Result;
use crate::model::{DimensionVersion, InventoryItem, MovieKey, Payment, Rental};
use crate::store::{SourceStore, WarehouseStore};

/// Sorted, de-duplicated, non-null ids referenced by a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistinctIds(Vec<i64>);

impl DistinctIds {
    pub fn collect<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = Option<i64>>,
    {
        let set: BTreeSet<i64> = ids.into_iter().flatten().collect();
        Self(set.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    /// The ids to send, or `None` when the lookup must be skipped.
    pub fn non_empty(&self) -> Option<&[i64]> {
        if self.0.is_empty() {
            None
        } else {
            Some(&self.0)
        }
    }
}

/// Every lookup row the fact-sales transform needs for one batch.
#[derive(Debug, Clone, Default)]
pub struct FactLookups {
    pub customers: Vec<DimensionVersion>,
    pub rentals: Vec<Rental>,
    pub inventory: Vec<InventoryItem>,
    pub movies: Vec<MovieKey>,
    pub stores: Vec<DimensionVersion>,
}

pub(crate) fn log_lookup(table: &'static str, ids: &DistinctIds, found: usize) {
    if ids.is_empty() {
        info!(table, "No ids to look up, skipping query");
    } else {
        debug!(table, ids = ids.len(), rows = found, "Looked up referenced rows");
    }
}

pub async fn resolve_fact_lookups<S, W>(
    payments: &[Payment],
    source: &S,
    warehouse: &W,
) -> Result<FactLookups>
where
    S: SourceStore + ?Sized,
    W: WarehouseStore + ?Sized,
{
    let customer_ids = DistinctIds::collect(payments.iter().map(|p| Some(p.customer_id)));
    let customers = match customer_ids.non_empty() {
        Some(ids) => warehouse.customer_versions(ids).await?,
        None => Vec::new(),
    };
    log_lookup("dim_customer", &customer_ids, customers.len());

    let rental_ids = DistinctIds::collect(payments.iter().map(|p| p.rental_id));
    let rentals = match rental_ids.non_empty() {
        Some(ids) => source.rentals(ids).await?,
        None => Vec::new(),
    };
    log_lookup("rental", &rental_ids, rentals.len());

    let inventory_ids = DistinctIds::collect(rentals.iter().map(|r| r.inventory_id));
    let inventory = match inventory_ids.non_empty() {
        Some(ids) => source.inventory(ids).await?,
        None => Vec::new(),
    };
    log_lookup("inventory", &inventory_ids, inventory.len());

    let film_ids = DistinctIds::collect(inventory.iter().map(|i| i.film_id));
    let store_ids = DistinctIds::collect(inventory.iter().map(|i| i.store_id));
    let (movies, stores) = tokio::try_join!(
        lookup_movies(warehouse, &film_ids),
        lookup_stores(warehouse, &store_ids),
    )?;

    Ok(FactLookups {
        customers,
        rentals,
        inventory,
        movies,
        stores,
    })
}

async fn lookup_movies<W>(warehouse: &W, film_ids: &DistinctIds) -> Result<Vec<MovieKey>>
where
    W: WarehouseStore + ?Sized,
{
    let movies = match film_ids.non_empty() {
        Some(ids) => warehouse.movies(ids).await?,
        None => Vec::new(),
    };
    log_lookup("dim_movie", film_ids, movies.len());
    Ok(movies)
}

async fn lookup_stores<W>(warehouse: &W, store_ids: &DistinctIds) -> Result<Vec<DimensionVersion>>
where
    W: WarehouseStore + ?Sized,
{
    let stores = match store_ids.non_empty() {
        Some(ids) => warehouse.store_versions(ids).await?,
        None => Vec::new(),
    };
    log_lookup("dim_store", store_ids, stores.len());
    Ok(stores)
}
