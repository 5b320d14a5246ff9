use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::error::Result;

/// Open a connection pool and run pending migrations.
///
/// Both `ytrag-api` and `ytrag-worker` call this independently on startup;
/// `sqlx::migrate!` takes its own advisory lock so two racing callers are
/// safe.
pub async fn connect(database_url: &str, pool_size: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(pool_size)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("database migrations applied");

    Ok(pool)
}
