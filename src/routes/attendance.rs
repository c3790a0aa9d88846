//! Attendance recording, listing, summaries, and the live event stream.

use std::collections::BTreeMap;

use rocket::http::Status;
use rocket::response::status;
use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::Json;
use rocket::tokio::select;
use rocket::{Shutdown, State, get, post};
use rocket_db_pools::sqlx::{self, Row};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::guards::{AuthUser, RequireTeacher};
use crate::auth::responses::Role;
use crate::error::ApiError;
use crate::events::{EventBroker, EventKind};
use crate::models::{
    AttendanceEntry, AttendanceRecord, AttendanceStatus, AttendanceSummary, DataResponse,
};
use crate::routes::helpers::{ensure_user_exists, resolve_class};
use crate::routes::params::{AttendanceListParams, SummaryParams};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MarkAttendanceRequest {
    pub class_id: i32,
    pub user_id: i32,
    pub status: AttendanceStatus,
}

/// Record an attendance event and announce it on the event stream.
#[openapi(tag = "Attendance")]
#[post("/attendance", data = "<request>")]
pub async fn mark_attendance(
    teacher: RequireTeacher,
    request: Json<MarkAttendanceRequest>,
    pool: &State<sqlx::PgPool>,
    broker: &State<EventBroker>,
) -> Result<status::Custom<Json<AttendanceRecord>>, ApiError> {
    let caller = teacher.0;

    let class = resolve_class(request.class_id, pool.inner()).await?;
    if class.teacher_id != caller.id && !caller.is_admin() {
        return Err(ApiError::Forbidden(
            "Only the class teacher may record attendance".to_string(),
        ));
    }

    ensure_user_exists(request.user_id, pool.inner()).await?;

    let record = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        INSERT INTO attendance (class_id, user_id, status)
        VALUES ($1, $2, $3)
        RETURNING id, class_id, user_id, status, recorded_at
        "#,
    )
    .bind(request.class_id)
    .bind(request.user_id)
    .bind(request.status.as_str())
    .fetch_one(pool.inner())
    .await?;

    broker.publish(EventKind::AttendanceMarked, &record);

    Ok(status::Custom(Status::Created, Json(record)))
}

/// List recent attendance events for a class, newest first.
#[openapi(tag = "Attendance")]
#[get("/attendance?<params..>")]
pub async fn list_attendance(
    _user: AuthUser,
    params: AttendanceListParams,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<DataResponse<Vec<AttendanceEntry>>>, ApiError> {
    resolve_class(params.class_id, pool.inner()).await?;

    let events: Vec<AttendanceEntry> = sqlx::query_as(
        r#"
        SELECT a.id, a.class_id, a.user_id, a.status, a.recorded_at, u.name AS user_name
        FROM attendance a
        JOIN users u ON u.id = a.user_id
        WHERE a.class_id = $1
        ORDER BY a.recorded_at DESC
        LIMIT $2
        "#,
    )
    .bind(params.class_id)
    .bind(params.limit())
    .fetch_all(pool.inner())
    .await?;

    Ok(Json(DataResponse { data: events }))
}

/// Per-status event counts for one user. Students may only query their
/// own summary.
#[openapi(tag = "Attendance")]
#[get("/attendance/summary?<params..>")]
pub async fn attendance_summary(
    user: AuthUser,
    params: SummaryParams,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<AttendanceSummary>, ApiError> {
    let target_id = params.user_id.unwrap_or(user.id);
    if target_id != user.id && user.role == Role::Student {
        return Err(ApiError::Forbidden(
            "Students may only view their own summary".to_string(),
        ));
    }

    let rows = sqlx::query(
        "SELECT status, COUNT(*) AS count FROM attendance WHERE user_id = $1 GROUP BY status",
    )
    .bind(target_id)
    .fetch_all(pool.inner())
    .await?;

    let mut summary = BTreeMap::new();
    for row in rows {
        let status: String = row.try_get("status")?;
        let count: i64 = row.try_get("count")?;
        summary.insert(status, count);
    }

    Ok(Json(AttendanceSummary {
        user_id: target_id,
        summary,
    }))
}

/// Server-Sent Events stream of live updates.
///
/// Emits `class_created`, `class_member_added` and `attendance_marked`
/// events with JSON payloads. Rocket's default heartbeat keeps idle
/// connections open through proxies; the stream ends on server shutdown.
#[get("/attendance/stream")]
pub async fn stream_attendance(
    broker: &State<EventBroker>,
    mut end: Shutdown,
) -> EventStream![] {
    let mut subscription = broker.subscribe();

    EventStream! {
        loop {
            let event = select! {
                event = subscription.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                _ = &mut end => break,
            };

            yield Event::json(&event.payload).event(event.kind.as_str());
        }
    }
}
