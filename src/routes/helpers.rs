//! Shared helper functions for Rocket route handlers.

use rocket_db_pools::sqlx::{self, PgPool};

use crate::error::ApiError;
use crate::models::ClassRoom;

/// Load a class by id, or return [`ApiError::NotFound`].
pub async fn resolve_class(class_id: i32, pool: &PgPool) -> Result<ClassRoom, ApiError> {
    sqlx::query_as::<_, ClassRoom>(
        "SELECT id, name, teacher_id, created_at FROM classes WHERE id = $1",
    )
    .bind(class_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Class {class_id} not found")))
}

/// Verify a user row exists, or return [`ApiError::NotFound`].
pub async fn ensure_user_exists(user_id: i32, pool: &PgPool) -> Result<(), ApiError> {
    let found: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    found
        .map(|_| ())
        .ok_or_else(|| ApiError::NotFound(format!("User {user_id} not found")))
}
