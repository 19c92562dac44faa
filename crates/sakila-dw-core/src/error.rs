// crates/sakila-dw-core/src/error.rs

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Could not connect to the {database} database: {source}")]
    Connection {
        database: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error(
        "Transformation result is not valid: row count is not equal (source={source_rows}; destination={destination_rows})"
    )]
    RowCountMismatch {
        source_rows: usize,
        destination_rows: usize,
    },

    #[error("Transformation result is not valid: column {column} has {rows} null value(s)")]
    MandatoryKeyNull { column: &'static str, rows: usize },

    #[error("Transformation result is not valid: {table} key {key} appears more than once")]
    DuplicateKey { table: &'static str, key: i64 },

    #[error("Refusing to query table {table} with an empty id list")]
    EmptyInClause { table: &'static str },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, EtlError>;
