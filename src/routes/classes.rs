//! Class management: creation, listing, and roster membership.

use rocket::State;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{get, post};
use rocket_db_pools::sqlx;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::guards::{AuthUser, RequireTeacher};
use crate::auth::responses::Role;
use crate::error::ApiError;
use crate::events::{EventBroker, EventKind};
use crate::models::{ClassRoom, DataResponse, Enrollment, RosterEntry};
use crate::routes::helpers::{ensure_user_exists, resolve_class};
use crate::routes::params::ClassListParams;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateClassRequest {
    pub name: String,
    /// Owning teacher; defaults to the caller. Only admins may create
    /// classes on behalf of another teacher.
    #[serde(default)]
    pub teacher_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddMemberRequest {
    pub user_id: i32,
}

/// Create a class and announce it on the event stream.
#[openapi(tag = "Classes")]
#[post("/classes", data = "<request>")]
pub async fn create_class(
    teacher: RequireTeacher,
    request: Json<CreateClassRequest>,
    pool: &State<sqlx::PgPool>,
    broker: &State<EventBroker>,
) -> Result<status::Custom<Json<ClassRoom>>, ApiError> {
    let caller = teacher.0;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Class name is required".to_string()));
    }

    let teacher_id = request.teacher_id.unwrap_or(caller.id);
    if teacher_id != caller.id {
        if !caller.is_admin() {
            return Err(ApiError::Forbidden(
                "Teachers may only create classes for themselves".to_string(),
            ));
        }

        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(teacher_id)
            .fetch_optional(pool.inner())
            .await?;

        match role {
            None => return Err(ApiError::NotFound(format!("User {teacher_id} not found"))),
            Some(role) if Role::from_str(&role) == Role::Student => {
                return Err(ApiError::BadRequest(format!(
                    "User {teacher_id} cannot own a class"
                )));
            }
            Some(_) => {}
        }
    }

    let class = sqlx::query_as::<_, ClassRoom>(
        "INSERT INTO classes (name, teacher_id) VALUES ($1, $2) RETURNING id, name, teacher_id, created_at",
    )
    .bind(name)
    .bind(teacher_id)
    .fetch_one(pool.inner())
    .await?;

    broker.publish(EventKind::ClassCreated, &class);

    Ok(status::Custom(Status::Created, Json(class)))
}

/// List classes owned by a teacher, newest first.
#[openapi(tag = "Classes")]
#[get("/classes?<params..>")]
pub async fn list_classes(
    user: AuthUser,
    params: ClassListParams,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<DataResponse<Vec<ClassRoom>>>, ApiError> {
    let teacher_id = params.teacher_id.unwrap_or(user.id);

    let classes: Vec<ClassRoom> = sqlx::query_as(
        "SELECT id, name, teacher_id, created_at FROM classes WHERE teacher_id = $1 ORDER BY id DESC",
    )
    .bind(teacher_id)
    .fetch_all(pool.inner())
    .await?;

    Ok(Json(DataResponse { data: classes }))
}

/// Return the roster of a class, ordered by member name.
#[openapi(tag = "Classes")]
#[get("/classes/<class_id>/members")]
pub async fn list_class_members(
    _user: AuthUser,
    class_id: i32,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<DataResponse<Vec<RosterEntry>>>, ApiError> {
    resolve_class(class_id, pool.inner()).await?;

    let members: Vec<RosterEntry> = sqlx::query_as(
        r#"
        SELECT u.id AS user_id, u.name, u.email, u.role
        FROM class_members cm
        JOIN users u ON u.id = cm.user_id
        WHERE cm.class_id = $1
        ORDER BY u.name
        "#,
    )
    .bind(class_id)
    .fetch_all(pool.inner())
    .await?;

    Ok(Json(DataResponse { data: members }))
}

/// Enroll a student in a class. Idempotent: re-adding an existing member
/// reports `already_enrolled` instead of failing.
#[openapi(tag = "Classes")]
#[post("/classes/<class_id>/members", data = "<request>")]
pub async fn add_class_member(
    teacher: RequireTeacher,
    class_id: i32,
    request: Json<AddMemberRequest>,
    pool: &State<sqlx::PgPool>,
    broker: &State<EventBroker>,
) -> Result<status::Custom<Json<Enrollment>>, ApiError> {
    let caller = teacher.0;

    let class = resolve_class(class_id, pool.inner()).await?;
    if class.teacher_id != caller.id && !caller.is_admin() {
        return Err(ApiError::Forbidden(
            "Only the class teacher may manage its roster".to_string(),
        ));
    }

    ensure_user_exists(request.user_id, pool.inner()).await?;

    let result = sqlx::query(
        "INSERT INTO class_members (class_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(class_id)
    .bind(request.user_id)
    .execute(pool.inner())
    .await?;

    let already_enrolled = result.rows_affected() == 0;

    let enrollment = Enrollment {
        class_id,
        user_id: request.user_id,
        already_enrolled,
    };

    if !already_enrolled {
        broker.publish(EventKind::ClassMemberAdded, &enrollment);
    }

    Ok(status::Custom(Status::Created, Json(enrollment)))
}
