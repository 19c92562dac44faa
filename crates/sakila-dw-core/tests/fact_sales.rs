mod common;

use anyhow::Result;
use common::{at, payment, version, MemorySource, MemoryWarehouse};
use sakila_dw_core::error::EtlError;
use sakila_dw_core::jobs::fact_sales::{self, FactSalesOptions};
use sakila_dw_core::jobs::{JobKind, RunOutcome, Watermark};
use sakila_dw_core::model::{InventoryItem, MovieKey, Rental};
use sakila_dw_core::temporal::ValidityBounds;

const C1: i64 = 1;

/// Customer `C1` with a version change on 2020-06-01, one store and one film
/// reachable through rental 100.
fn fixture() -> (MemorySource, MemoryWarehouse) {
    let source = MemorySource {
        rentals: vec![
            Rental {
                rental_id: 100,
                inventory_id: Some(1000),
            },
            Rental {
                rental_id: 101,
                inventory_id: None,
            },
            Rental {
                rental_id: 102,
                inventory_id: Some(1002),
            },
        ],
        inventory: vec![
            InventoryItem {
                inventory_id: 1000,
                film_id: Some(7),
                store_id: Some(1),
            },
            InventoryItem {
                inventory_id: 1002,
                film_id: Some(8),
                store_id: Some(99),
            },
        ],
        ..Default::default()
    };

    let warehouse = MemoryWarehouse {
        customers: vec![
            version(5, C1, at(2020, 1, 1), Some(at(2020, 6, 1))),
            version(6, C1, at(2020, 6, 1), None),
        ],
        store_versions: vec![version(11, 1, at(2019, 1, 1), None)],
        movie_keys: vec![MovieKey {
            movie_key: 70,
            film_id: 7,
        }],
        ..Default::default()
    };

    (source, warehouse)
}

#[tokio::test]
async fn loads_new_payments_once_then_reports_no_new_data() -> Result<()> {
    let (source, warehouse) = fixture();
    source.push_payments([
        payment(1, C1, Some(100), at(2020, 3, 15)),
        payment(2, C1, Some(101), at(2020, 4, 1)),
        payment(3, C1, None, at(2020, 7, 1)),
    ]);
    let options = FactSalesOptions::default();

    let first = fact_sales::run(&source, &warehouse, &options).await?;
    assert_eq!(
        first,
        RunOutcome::Loaded {
            job: JobKind::FactSales,
            rows: 3,
            previous_watermark: None,
            watermark: Watermark::Key(3),
        }
    );
    assert_eq!(warehouse.sales().len(), 3);

    let second = fact_sales::run(&source, &warehouse, &options).await?;
    assert_eq!(
        second,
        RunOutcome::NoNewData {
            job: JobKind::FactSales,
            watermark: Some(Watermark::Key(3)),
        }
    );
    assert_eq!(warehouse.sales().len(), 3);

    source.push_payments([payment(4, C1, Some(100), at(2020, 8, 1))]);
    let third = fact_sales::run(&source, &warehouse, &options).await?;
    assert_eq!(third.rows_loaded(), 1);
    assert_eq!(warehouse.sales().len(), 4);
    Ok(())
}

#[tokio::test]
async fn batch_size_caps_each_run() -> Result<()> {
    let (source, warehouse) = fixture();
    source.push_payments((1..=5).map(|id| payment(id, C1, None, at(2020, 7, 1))));
    let options = FactSalesOptions {
        batch_size: 2,
        ..Default::default()
    };

    let mut loaded = Vec::new();
    loop {
        match fact_sales::run(&source, &warehouse, &options).await? {
            RunOutcome::Loaded { rows, .. } => loaded.push(rows),
            RunOutcome::NoNewData { .. } => break,
        }
    }

    assert_eq!(loaded, vec![2, 2, 1]);
    let keys: Vec<i64> = warehouse.sales().iter().map(|s| s.sales_key).collect();
    assert_eq!(keys, vec![1, 2, 3, 4, 5]);
    Ok(())
}

#[tokio::test]
async fn attributes_customer_version_valid_at_payment_time() -> Result<()> {
    let (source, warehouse) = fixture();
    source.push_payments([
        payment(1, C1, None, at(2020, 3, 15)),
        payment(2, C1, None, at(2020, 7, 1)),
    ]);

    fact_sales::run(&source, &warehouse, &FactSalesOptions::default()).await?;

    let sales = warehouse.sales();
    assert_eq!(sales[0].customer_key, 5);
    assert_eq!(sales[1].customer_key, 6);
    Ok(())
}

#[tokio::test]
async fn resolves_movie_and_store_through_rental_chain() -> Result<()> {
    let (source, warehouse) = fixture();
    source.push_payments([payment(1, C1, Some(100), at(2020, 7, 4))]);

    fact_sales::run(&source, &warehouse, &FactSalesOptions::default()).await?;

    let sale = &warehouse.sales()[0];
    assert_eq!(sale.sales_key, 1);
    assert_eq!(sale.date_key, "20200704");
    assert_eq!(sale.customer_key, 6);
    assert_eq!(sale.movie_key, Some(70));
    assert_eq!(sale.store_key, Some(11));
    assert!((sale.sales_amount - 4.99).abs() < f64::EPSILON);
    Ok(())
}

#[tokio::test]
async fn missing_store_dimension_keeps_row_with_null_key() -> Result<()> {
    let (source, warehouse) = fixture();
    // rental 102 → inventory 1002 → store 99, which has no dim_store row;
    // film 8 has no dim_movie row either.
    source.push_payments([
        payment(1, C1, Some(102), at(2020, 7, 1)),
        payment(2, C1, Some(100), at(2020, 7, 1)),
    ]);

    let outcome = fact_sales::run(&source, &warehouse, &FactSalesOptions::default()).await?;
    assert_eq!(outcome.rows_loaded(), 2);

    let sales = warehouse.sales();
    assert_eq!(sales[0].store_key, None);
    assert_eq!(sales[0].movie_key, None);
    assert_eq!(sales[1].store_key, Some(11));
    Ok(())
}

#[tokio::test]
async fn unresolvable_customer_aborts_before_load() -> Result<()> {
    let (source, warehouse) = fixture();
    source.push_payments([
        payment(1, C1, None, at(2020, 7, 1)),
        payment(2, 404, None, at(2020, 7, 1)),
    ]);

    let err = fact_sales::run(&source, &warehouse, &FactSalesOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EtlError::MandatoryKeyNull {
            column: "customer_key",
            rows: 1
        }
    ));
    assert!(warehouse.sales().is_empty());
    Ok(())
}

#[tokio::test]
async fn overlapping_intervals_raise_row_count_mismatch() -> Result<()> {
    let (source, mut warehouse) = fixture();
    warehouse
        .customers
        .push(version(7, C1, at(2020, 5, 1), None));
    source.push_payments([payment(1, C1, None, at(2020, 7, 1))]);

    let err = fact_sales::run(&source, &warehouse, &FactSalesOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EtlError::RowCountMismatch {
            source_rows: 1,
            destination_rows: 2
        }
    ));
    assert!(warehouse.sales().is_empty());
    Ok(())
}

#[tokio::test]
async fn version_boundary_follows_configured_bounds() -> Result<()> {
    // Version 5 ends exactly when version 6 starts.
    let boundary = at(2020, 6, 1);

    let (source, warehouse) = fixture();
    source.push_payments([payment(1, C1, None, boundary)]);
    fact_sales::run(&source, &warehouse, &FactSalesOptions::default()).await?;
    assert_eq!(warehouse.sales()[0].customer_key, 6);

    let (source, warehouse) = fixture();
    source.push_payments([payment(1, C1, None, boundary)]);
    let closed = FactSalesOptions {
        bounds: ValidityBounds::Closed,
        ..Default::default()
    };
    let err = fact_sales::run(&source, &warehouse, &closed)
        .await
        .unwrap_err();
    assert!(matches!(err, EtlError::RowCountMismatch { .. }));
    assert!(warehouse.sales().is_empty());
    Ok(())
}

#[tokio::test]
async fn batch_without_rentals_skips_chained_lookups() -> Result<()> {
    let (source, warehouse) = fixture();
    source.push_payments([
        payment(1, C1, None, at(2020, 7, 1)),
        payment(2, C1, None, at(2020, 7, 2)),
    ]);

    let outcome = fact_sales::run(&source, &warehouse, &FactSalesOptions::default()).await?;
    assert_eq!(outcome.rows_loaded(), 2);

    assert!(source.queried().is_empty());
    assert_eq!(warehouse.queried(), vec!["dim_customer"]);
    assert!(warehouse
        .sales()
        .iter()
        .all(|s| s.movie_key.is_none() && s.store_key.is_none()));
    Ok(())
}

#[tokio::test]
async fn lookups_are_issued_once_per_table() -> Result<()> {
    let (source, warehouse) = fixture();
    source.push_payments([
        payment(1, C1, Some(100), at(2020, 7, 1)),
        payment(2, C1, Some(100), at(2020, 7, 2)),
        payment(3, C1, Some(102), at(2020, 7, 3)),
        payment(4, C1, Some(101), at(2020, 7, 4)),
    ]);

    fact_sales::run(&source, &warehouse, &FactSalesOptions::default()).await?;

    assert_eq!(source.queried(), vec!["rental", "inventory"]);
    let mut warehouse_tables = warehouse.queried();
    warehouse_tables.sort();
    assert_eq!(warehouse_tables, vec!["dim_customer", "dim_movie", "dim_store"]);
    Ok(())
}
