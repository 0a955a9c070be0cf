//! # Postgres Persistence
//!
//! Store trait implementations over SQLx. Optional: without `DATABASE_URL`
//! the service runs on the in-memory stores and nothing survives a restart.
//!
//! Every read filters on [`ACTIVE_PREDICATE`]. Queries are built at runtime
//! with `sqlx::query`/`query_as`, so the crate builds without a database.

pub mod anchors;
pub mod domain;
pub mod identities;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tc_core::lifecycle::ACTIVE_PREDICATE;
use tc_core::StoreError;

const UNIQUE_VIOLATION: &str = "23505";

/// Connect and apply the embedded migrations.
pub async fn init_pool(url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;
    tracing::info!("connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");
    Ok(pool)
}

pub(crate) fn store_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::Duplicate(db.message().to_string());
        }
    }
    StoreError::Database(err.to_string())
}

/// `WHERE` fragment for visible rows, optionally qualified by a table alias.
pub(crate) fn active(alias: Option<&str>) -> String {
    match alias {
        Some(a) => format!("{a}.{ACTIVE_PREDICATE}"),
        None => ACTIVE_PREDICATE.to_string(),
    }
}
