//! Relational store: connection pool setup and the Result Handler (C11).

mod result_handler;

pub use result_handler::ResultHandler;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Open the connection pool used by the Result Handler.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}
