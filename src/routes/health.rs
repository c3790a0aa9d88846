//! Lightweight service health endpoints used for readiness checks and tests.

use rocket::State;
use rocket::get;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket_db_pools::sqlx;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::db;

/// Basic response payload describing API health.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    /// Static status string reporting application readiness.
    pub status: String,
}

/// Outcome of the database connectivity probe.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DbHealthResponse {
    pub ok: bool,
    pub message: String,
}

/// Health check endpoint returning a trivial JSON payload.
#[openapi(tag = "Health")]
#[get("/health")]
pub fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Database connectivity check: runs `SELECT 1` against the pool and
/// reports 503 when the database is unreachable.
#[openapi(tag = "Health")]
#[get("/health/db")]
pub async fn db_health_check(
    pool: &State<sqlx::PgPool>,
) -> status::Custom<Json<DbHealthResponse>> {
    match db::check_connectivity(pool.inner()).await {
        Ok(()) => status::Custom(
            Status::Ok,
            Json(DbHealthResponse {
                ok: true,
                message: "Database connection OK".to_string(),
            }),
        ),
        Err(err) => {
            log::error!("database connectivity check failed: {}", err);
            status::Custom(
                Status::ServiceUnavailable,
                Json(DbHealthResponse {
                    ok: false,
                    message: format!("Database connection failed: {err}"),
                }),
            )
        }
    }
}
