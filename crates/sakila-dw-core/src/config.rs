use std::env;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::temporal::ValidityBounds;

pub const DEFAULT_BATCH_SIZE: i64 = 100_000;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// A job holds one warehouse connection for its run lock and queries on others.
pub const MIN_MAX_CONNECTIONS: u32 = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set (or DATABASE_URL as a fallback)")]
    MissingUrl(&'static str),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Runtime settings shared by every job.
#[derive(Debug, Clone, Deserialize)]
pub struct EtlConfig {
    pub source_database_url: String,
    pub warehouse_database_url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub validity_bounds: ValidityBounds,
    #[serde(default)]
    pub date_dimension: DateDimensionConfig,
}

/// Range generated by the `dim_date` job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DateDimensionConfig {
    #[serde(default = "default_date_start")]
    pub start: NaiveDate,
    #[serde(default = "default_date_end")]
    pub end: NaiveDate,
}

impl Default for DateDimensionConfig {
    fn default() -> Self {
        Self {
            start: default_date_start(),
            end: default_date_end(),
        }
    }
}

impl EtlConfig {
    /// Builds the configuration from `SAKILA_DW_*` environment variables.
    ///
    /// Both connection URLs fall back to `DATABASE_URL`, so a single database
    /// can host the source and the warehouse schemas.
    pub fn from_env() -> Result<Self, ConfigError> {
        let source_database_url = env::var("SAKILA_DW_SOURCE_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .map_err(|_| ConfigError::MissingUrl("SAKILA_DW_SOURCE_DATABASE_URL"))?;
        let warehouse_database_url = env::var("SAKILA_DW_WAREHOUSE_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .map_err(|_| ConfigError::MissingUrl("SAKILA_DW_WAREHOUSE_DATABASE_URL"))?;

        let batch_size = match env::var("SAKILA_DW_BATCH_SIZE") {
            Ok(raw) => parse_batch_size(&raw)?,
            Err(_) => DEFAULT_BATCH_SIZE,
        };
        let max_connections = match env::var("SAKILA_DW_MAX_CONNECTIONS") {
            Ok(raw) => parse_max_connections(&raw)?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };
        let validity_bounds = match env::var("SAKILA_DW_VALIDITY_BOUNDS") {
            Ok(raw) => raw.parse()?,
            Err(_) => ValidityBounds::default(),
        };

        Ok(Self {
            source_database_url,
            warehouse_database_url,
            batch_size,
            max_connections,
            validity_bounds,
            date_dimension: DateDimensionConfig::default(),
        })
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        if config.batch_size <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "batch_size",
                value: config.batch_size.to_string(),
            });
        }
        if config.max_connections < MIN_MAX_CONNECTIONS {
            return Err(ConfigError::InvalidValue {
                key: "max_connections",
                value: config.max_connections.to_string(),
            });
        }
        Ok(config)
    }
}

pub fn parse_batch_size(raw: &str) -> Result<i64, ConfigError> {
    match raw.trim().parse::<i64>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(ConfigError::InvalidValue {
            key: "batch_size",
            value: raw.to_string(),
        }),
    }
}

pub fn parse_max_connections(raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(size) if size >= MIN_MAX_CONNECTIONS => Ok(size),
        _ => Err(ConfigError::InvalidValue {
            key: "max_connections",
            value: raw.to_string(),
        }),
    }
}

fn default_batch_size() -> i64 {
    DEFAULT_BATCH_SIZE
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_date_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2005, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_date_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2006, 2, 16).unwrap_or(NaiveDate::MIN)
}
