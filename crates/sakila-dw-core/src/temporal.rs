//! Joins that attach dimension surrogate keys to fact rows.
//!
//! Type-2 dimensions carry several versions per business key, each valid
//! over `[start_date, end_date)`. A fact row must be attributed to the
//! version that was valid when the transaction happened, not to the current
//! one, so every version of the key is a join candidate and the validity
//! interval decides which one survives.
//!
//! Both joins here are left joins: a fact row with no matching dimension row
//! is kept with a null surrogate key. A row only multiplies when the
//! dimension itself is inconsistent (overlapping intervals, duplicate type-1
//! keys), which the row-count validation downstream reports.

use std::str::FromStr;

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

pub const START_DATE: &str = "start_date";
pub const END_DATE: &str = "end_date";

const ROW_INDEX: &str = "__fact_row";

/// How the closing end of a validity interval is compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityBounds {
    /// `start_date <= ts < end_date`
    #[default]
    HalfOpen,
    /// `start_date <= ts <= end_date`
    Closed,
}

impl ValidityBounds {
    pub fn covers(
        self,
        timestamp: NaiveDateTime,
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
    ) -> bool {
        if timestamp < start {
            return false;
        }
        match (self, end) {
            (_, None) => true,
            (ValidityBounds::HalfOpen, Some(end)) => timestamp < end,
            (ValidityBounds::Closed, Some(end)) => timestamp <= end,
        }
    }

    /// Expression form of [`ValidityBounds::covers`] over the `start_date`
    /// and `end_date` columns.
    pub fn covers_expr(self, timestamp: &str) -> Expr {
        let before_end = match self {
            ValidityBounds::HalfOpen => col(timestamp).lt(col(END_DATE)),
            ValidityBounds::Closed => col(timestamp).lt_eq(col(END_DATE)),
        };
        col(START_DATE)
            .lt_eq(col(timestamp))
            .and(col(END_DATE).is_null().or(before_end))
    }
}

impl FromStr for ValidityBounds {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "half_open" | "half-open" => Ok(ValidityBounds::HalfOpen),
            "closed" => Ok(ValidityBounds::Closed),
            _ => Err(ConfigError::InvalidValue {
                key: "validity_bounds",
                value: value.to_string(),
            }),
        }
    }
}

/// Column names for one type-2 dimension join.
#[derive(Debug, Clone, Copy)]
pub struct Type2Join<'a> {
    pub business_key: &'a str,
    pub surrogate_key: &'a str,
    pub timestamp: &'a str,
    pub bounds: ValidityBounds,
}

/// Attaches `join.surrogate_key` from the version of `versions` whose
/// validity interval contains each fact row's `join.timestamp`.
///
/// `versions` must hold the business key, surrogate key, `start_date` and
/// `end_date` columns. The output keeps the row order of `facts`.
pub fn temporal_left_join(
    facts: &DataFrame,
    versions: &DataFrame,
    join: &Type2Join<'_>,
) -> PolarsResult<DataFrame> {
    let indexed = facts.clone().lazy().with_row_index(ROW_INDEX, None);

    let candidates = versions.clone().lazy().select([
        col(join.business_key),
        col(join.surrogate_key),
        col(START_DATE),
        col(END_DATE),
    ]);

    let matched = indexed
        .clone()
        .select([
            col(ROW_INDEX),
            col(join.business_key),
            col(join.timestamp),
        ])
        .join(
            candidates,
            [col(join.business_key)],
            [col(join.business_key)],
            JoinArgs::new(JoinType::Inner),
        )
        .filter(join.bounds.covers_expr(join.timestamp))
        .select([col(ROW_INDEX), col(join.surrogate_key)]);

    let joined = indexed
        .join(
            matched,
            [col(ROW_INDEX)],
            [col(ROW_INDEX)],
            JoinArgs::new(JoinType::Left),
        )
        .sort(
            [ROW_INDEX],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;

    joined.drop(ROW_INDEX)
}

/// Plain left join on `key` for single-version lookups (the foreign-key
/// chain and type-1 dimensions). The output keeps the row order of `facts`.
pub fn left_join(facts: &DataFrame, lookup: &DataFrame, key: &str) -> PolarsResult<DataFrame> {
    let joined = facts
        .clone()
        .lazy()
        .with_row_index(ROW_INDEX, None)
        .join(
            lookup.clone().lazy(),
            [col(key)],
            [col(key)],
            JoinArgs::new(JoinType::Left),
        )
        .sort(
            [ROW_INDEX],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;

    joined.drop(ROW_INDEX)
}
