// crates/sakila-dw-core/src/db.rs

use std::time::Duration;

use sqlx::{pool::PoolConnection, postgres::PgPoolOptions, Pool, Postgres};
use tokio::task;
use tracing::{info, warn};

use crate::config::EtlConfig;
use crate::error::{EtlError, Result};

pub type DbPool = Pool<Postgres>;

/// Opens a Postgres pool. `database` only labels the connection error.
pub async fn connect(
    database: &'static str,
    database_url: &str,
    max_connections: u32,
) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .map_err(|source| EtlError::Connection { database, source })?;

    info!(database, "Database connection pool established");
    Ok(pool)
}

/// Applies the embedded warehouse schema.
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// The two handles a job runs against, opened once per run.
#[derive(Debug, Clone)]
pub struct Connections {
    pub source: DbPool,
    pub warehouse: DbPool,
}

impl Connections {
    pub async fn open(config: &EtlConfig) -> Result<Self> {
        let source = connect("source", &config.source_database_url, config.max_connections).await?;
        let warehouse = match connect(
            "warehouse",
            &config.warehouse_database_url,
            config.max_connections,
        )
        .await
        {
            Ok(pool) => pool,
            Err(err) => {
                source.close().await;
                return Err(err);
            }
        };
        Ok(Self { source, warehouse })
    }

    pub async fn close(self) {
        self.source.close().await;
        self.warehouse.close().await;
    }
}

/// Session-level advisory lock held on the warehouse for the duration of a
/// job, so two runs of the same job never read the same watermark.
pub struct RunLock {
    conn: Option<PoolConnection<Postgres>>,
    key: i64,
}

impl RunLock {
    pub async fn acquire(pool: &DbPool, key: i64) -> Result<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query::<Postgres>("SELECT pg_advisory_lock($1)")
            .bind(key)
            .execute(conn.as_mut())
            .await?;
        Ok(Self {
            conn: Some(conn),
            key,
        })
    }

    pub async fn release(mut self) -> Result<()> {
        if let Some(mut conn) = self.conn.take() {
            sqlx::query::<Postgres>("SELECT pg_advisory_unlock($1)")
                .bind(self.key)
                .execute(conn.as_mut())
                .await?;
        }
        Ok(())
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            let key = self.key;
            task::spawn(async move {
                if let Err(err) = sqlx::query::<Postgres>("SELECT pg_advisory_unlock($1)")
                    .bind(key)
                    .execute(conn.as_mut())
                    .await
                {
                    warn!("failed to release run lock in drop: {err}");
                }
            });
        }
    }
}
