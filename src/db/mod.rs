use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Open the result backend pool.
///
/// Traffic is short guarded `UPDATE`s: one claim and one terminal write
/// per job, plus status reads from the gateway. A single warm connection
/// covers an idle deployment, and the 10 s acquire timeout surfaces as a
/// transient [`sqlx::Error::PoolTimedOut`] that callers retry.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

pub mod queries;
