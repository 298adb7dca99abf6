use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use anyhow::{Context, Result};
use std::time::Duration;

use crate::repositories::trip::CREATE_TRIPS_TABLE;

/// The maximum number of pooled connections.
const MAX_POOL_SIZE: usize = 16;

/// Creates a new database connection pool.
///
/// # Arguments
///
/// * `database_url` - The URL of the PostgreSQL database.
///
/// # Returns
///
/// A `Result` containing the `Pool`.
pub fn create_pool(database_url: &str) -> Result<Pool> {
    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());

    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    cfg.pool = Some(PoolConfig {
        max_size: MAX_POOL_SIZE,
        timeouts: deadpool_postgres::Timeouts {
            wait: Some(Duration::from_secs(5)),
            create: Some(Duration::from_secs(2)),
            recycle: Some(Duration::from_secs(1)),
        },
        ..Default::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .context("Failed to create PostgreSQL pool")
}

/// Creates the tables the service needs, if they are missing.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
pub async fn ensure_schema(pool: &Pool) -> Result<()> {
    let client = pool.get().await.context("Failed to connect to PostgreSQL")?;
    client
        .batch_execute(CREATE_TRIPS_TABLE)
        .await
        .context("Failed to create ai_trips table")?;
    tracing::info!("✅ Schema ready (ai_trips)");
    Ok(())
}
