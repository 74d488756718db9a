//! Connection pool setup and migration runner.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::DbConfig;
use crate::error::{DbError, DbResult};

pub async fn connect(config: &DbConfig) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.dsn)
        .await
        .map_err(DbError::Query)?;

    info!(max_connections = config.max_connections, "connected to metadata store");
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> DbResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;
    info!("metadata store migrations applied");
    Ok(())
}
