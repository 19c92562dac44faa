use chrono::{Datelike, NaiveDate, Weekday};
use tracing::{debug, info};

use crate::config::DateDimensionConfig;
use crate::error::Result;
use crate::jobs::{JobKind, RunOutcome, Watermark};
use crate::model::DimDate;
use crate::store::WarehouseStore;

/// Extends `dim_date` from the day after its latest date up to `range.end`.
pub async fn run<W>(warehouse: &W, range: &DateDimensionConfig) -> Result<RunOutcome>
where
    W: WarehouseStore + ?Sized,
{
    let latest = warehouse.latest_date().await?;
    let start = match latest {
        Some(date) => match date.succ_opt() {
            Some(next) => next,
            None => {
                return Ok(RunOutcome::NoNewData {
                    job: JobKind::DimDate,
                    watermark: Some(Watermark::Date(date)),
                })
            }
        },
        None => range.start,
    };
    debug!(start_date_range = %start, end_date_range = %range.end, "Resolved date range");

    if range.end < start {
        info!("Date dimension already covers the configured range");
        return Ok(RunOutcome::NoNewData {
            job: JobKind::DimDate,
            watermark: latest.map(Watermark::Date),
        });
    }

    let rows = generate_dates(start, range.end);
    let appended = warehouse.append_dates(&rows).await?;
    info!(rows = appended, end = %range.end, "Loaded dim_date");

    Ok(RunOutcome::Loaded {
        job: JobKind::DimDate,
        rows: appended,
        previous_watermark: latest.map(Watermark::Date),
        watermark: Watermark::Date(range.end),
    })
}

/// One row per calendar day in `[start, end]`; empty when `end < start`.
pub fn generate_dates(start: NaiveDate, end: NaiveDate) -> Vec<DimDate> {
    start
        .iter_days()
        .take_while(|date| *date <= end)
        .map(date_row)
        .collect()
}

fn date_row(date: NaiveDate) -> DimDate {
    let month = date.month() as i32;
    DimDate {
        date_key: date.format("%Y%m%d").to_string(),
        date,
        day: date.day() as i32,
        week: date.iso_week().week() as i32,
        month,
        quarter: (month - 1) / 3 + 1,
        year: date.year(),
        is_weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        // TODO: populate from a holiday calendar table once the source has one.
        is_holiday: false,
    }
}
