use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::FromRow;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Generic envelope wrapping list/detail payloads as `{"data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DataResponse<T> {
    pub data: T,
}

// ===== User Models =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub created_at: Option<DateTime<Utc>>,
}

// ===== Class Models =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct ClassRoom {
    pub id: i32,
    pub name: String,
    pub teacher_id: i32,
    pub created_at: Option<DateTime<Utc>>,
}

/// One row of a class roster, joined with the member's user record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct RosterEntry {
    pub user_id: i32,
    pub name: Option<String>,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Enrollment {
    pub class_id: i32,
    pub user_id: i32,
    /// True when the student was already on the roster and the insert
    /// was a no-op.
    pub already_enrolled: bool,
}

// ===== Attendance Models =====

/// Allowed attendance states. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct AttendanceRecord {
    pub id: i32,
    pub class_id: i32,
    pub user_id: i32,
    pub status: String,
    pub recorded_at: DateTime<Utc>,
}

/// Attendance event joined with the subject's display name for listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct AttendanceEntry {
    pub id: i32,
    pub class_id: i32,
    pub user_id: i32,
    pub status: String,
    pub recorded_at: DateTime<Utc>,
    pub user_name: Option<String>,
}

/// Per-status event counts for one user.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AttendanceSummary {
    pub user_id: i32,
    pub summary: BTreeMap<String, i64>,
}
