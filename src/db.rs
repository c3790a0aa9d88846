//! Database pool wiring and schema management.

use rocket_db_pools::{Database, sqlx};
use sqlx::PgPool;
use sqlx::migrate::MigrateError;

#[derive(Database)]
#[database("rollcall_db")]
pub struct RollcallDb(sqlx::PgPool);

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Apply all pending migrations against the given pool.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Resolve the Postgres connection URL from the environment.
///
/// Precedence follows the deployment convention: `POSTGRES_URL` wins,
/// otherwise the URL is assembled from `POSTGRES_HOST`, `POSTGRES_PORT`
/// (default 5432), `POSTGRES_DB`, `POSTGRES_USER` and `POSTGRES_PASSWORD`.
/// Returns `None` when neither form is configured, leaving the figment
/// (`ROCKET_DATABASES`) as the only source.
pub fn database_url_from_env() -> Option<String> {
    if let Ok(url) = std::env::var("POSTGRES_URL") {
        if !url.trim().is_empty() {
            return Some(url);
        }
    }

    let host = std::env::var("POSTGRES_HOST").ok()?;
    let db = std::env::var("POSTGRES_DB").ok()?;
    let user = std::env::var("POSTGRES_USER").ok()?;
    let password = std::env::var("POSTGRES_PASSWORD").ok()?;
    let port = std::env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".to_string());

    Some(format!(
        "postgres://{}:{}@{}:{}/{}",
        user, password, host, port, db
    ))
}

/// Lightweight connectivity probe used by the database health endpoint.
pub async fn check_connectivity(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
