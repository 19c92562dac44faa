//! Incremental load of new stores into the type-2 `dim_store` dimension.
//!
//! A new store opens its first validity interval at its `last_update`
//! timestamp. Closing intervals when a store's attributes change belongs to
//! a separate job.

use std::collections::HashMap;

use tracing::info;

use crate::error::Result;
use crate::extract::EMPTY_WATERMARK;
use crate::jobs::{JobKind, RunOutcome, Watermark};
use crate::model::{Address, City, Country, DimStore, Staff, Store};
use crate::resolver::{log_lookup, DistinctIds};
use crate::store::{SourceStore, WarehouseStore};
use crate::validation::validate_unique_keys;

/// Lookup rows referenced by a batch of stores.
#[derive(Debug, Clone, Default)]
pub struct StoreLookups {
    pub addresses: Vec<Address>,
    pub cities: Vec<City>,
    pub countries: Vec<Country>,
    pub staff: Vec<Staff>,
}

pub async fn run<S, W>(source: &S, warehouse: &W, batch_size: i64) -> Result<RunOutcome>
where
    S: SourceStore + ?Sized,
    W: WarehouseStore + ?Sized,
{
    let last_store_id = warehouse.max_store_id().await?;
    let stores = source
        .stores_after(last_store_id.unwrap_or(EMPTY_WATERMARK), batch_size)
        .await?;
    info!(last_store_id = ?last_store_id, rows = stores.len(), "Extracted new store rows");

    let Some(new_watermark) = stores.iter().map(|s| s.store_id).max() else {
        info!("No new record in source table");
        return Ok(RunOutcome::NoNewData {
            job: JobKind::DimStore,
            watermark: last_store_id.map(Watermark::Key),
        });
    };

    let lookups = resolve_store_lookups(&stores, source).await?;
    let rows = join_store(&stores, &lookups);
    validate_unique_keys("dim_store", rows.iter().map(|row| row.store_id))?;

    let appended = warehouse.append_stores(&rows).await?;
    info!(rows = appended, watermark = new_watermark, "Loaded dim_store");

    Ok(RunOutcome::Loaded {
        job: JobKind::DimStore,
        rows: appended,
        previous_watermark: last_store_id.map(Watermark::Key),
        watermark: Watermark::Key(new_watermark),
    })
}

/// store → address → city → country, and store → staff (manager).
pub async fn resolve_store_lookups<S>(stores: &[Store], source: &S) -> Result<StoreLookups>
where
    S: SourceStore + ?Sized,
{
    let address_ids = DistinctIds::collect(stores.iter().map(|s| s.address_id));
    let staff_ids = DistinctIds::collect(stores.iter().map(|s| s.manager_staff_id));

    let (addresses, staff) = tokio::try_join!(
        async {
            match address_ids.non_empty() {
                Some(ids) => source.addresses(ids).await,
                None => Ok(Vec::new()),
            }
        },
        async {
            match staff_ids.non_empty() {
                Some(ids) => source.staff(ids).await,
                None => Ok(Vec::new()),
            }
        },
    )?;
    log_lookup("address", &address_ids, addresses.len());
    log_lookup("staff", &staff_ids, staff.len());

    let city_ids = DistinctIds::collect(addresses.iter().map(|a| a.city_id));
    let cities = match city_ids.non_empty() {
        Some(ids) => source.cities(ids).await?,
        None => Vec::new(),
    };
    log_lookup("city", &city_ids, cities.len());

    let country_ids = DistinctIds::collect(cities.iter().map(|c| c.country_id));
    let countries = match country_ids.non_empty() {
        Some(ids) => source.countries(ids).await?,
        None => Vec::new(),
    };
    log_lookup("country", &country_ids, countries.len());

    Ok(StoreLookups {
        addresses,
        cities,
        countries,
        staff,
    })
}

pub fn join_store(stores: &[Store], lookups: &StoreLookups) -> Vec<DimStore> {
    let addresses: HashMap<i64, &Address> = lookups
        .addresses
        .iter()
        .map(|a| (a.address_id, a))
        .collect();
    let cities: HashMap<i64, &City> = lookups.cities.iter().map(|c| (c.city_id, c)).collect();
    let countries: HashMap<i64, &Country> = lookups
        .countries
        .iter()
        .map(|c| (c.country_id, c))
        .collect();
    let staff: HashMap<i64, &Staff> = lookups.staff.iter().map(|s| (s.staff_id, s)).collect();

    stores
        .iter()
        .map(|store| {
            let address = store.address_id.and_then(|id| addresses.get(&id).copied());
            let city = address
                .and_then(|a| a.city_id)
                .and_then(|id| cities.get(&id).copied());
            let country = city
                .and_then(|c| c.country_id)
                .and_then(|id| countries.get(&id).copied());
            let manager = store
                .manager_staff_id
                .and_then(|id| staff.get(&id).copied());

            DimStore {
                store_id: store.store_id,
                address: address.map(|a| a.address.clone()),
                address2: address.and_then(|a| a.address2.clone()),
                district: address.and_then(|a| a.district.clone()),
                city: city.map(|c| c.city.clone()),
                country: country.map(|c| c.country.clone()),
                postal_code: address.and_then(|a| a.postal_code.clone()),
                manager_first_name: manager.map(|m| m.first_name.clone()),
                manager_last_name: manager.map(|m| m.last_name.clone()),
                start_date: store.last_update,
                end_date: None,
            }
        })
        .collect()
}
