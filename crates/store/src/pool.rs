//! Connection pool construction and migration running.
//!
//! Grounded in the teacher's own `crates/server/src/main.rs` bootstrap: an explicit
//! `PgPoolOptions` builder (rather than `PgPool::connect`) so connection limits,
//! acquire timeout, and idle/max lifetime are all controlled, followed by a single
//! `sqlx::migrate!` run before anything else touches the pool.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Build the process-wide Postgres pool.
pub async fn connect_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run pending migrations. Safe to call on every startup; `sqlx::migrate!` only
/// applies migrations that have not yet run.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}
