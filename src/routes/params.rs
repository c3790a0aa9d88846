//! Query parameter helpers shared by API route handlers.
//!
//! Strongly-typed `FromForm` structs for URL query strings, deriving
//! `JsonSchema` so the generated OpenAPI document reflects the available
//! parameters and their defaults.

use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const DEFAULT_EVENT_LIMIT: i64 = 100;
const MAX_EVENT_LIMIT: i64 = 500;

/// Query parameters for the class list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, rocket::form::FromForm, JsonSchema)]
pub struct ClassListParams {
    /// Teacher whose classes to list; defaults to the caller.
    #[serde(default)]
    pub teacher_id: Option<i32>,
}

/// Query parameters for the attendance list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, rocket::form::FromForm, JsonSchema)]
pub struct AttendanceListParams {
    /// Class whose events to list.
    pub class_id: i32,
    /// Maximum number of events to return (default 100, capped at 500).
    #[serde(default)]
    pub limit: Option<i64>,
}

impl AttendanceListParams {
    /// Normalized event limit.
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_EVENT_LIMIT)
            .clamp(1, MAX_EVENT_LIMIT)
    }
}

/// Query parameters for the attendance summary endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, rocket::form::FromForm, JsonSchema)]
pub struct SummaryParams {
    /// User to summarize; defaults to the caller.
    #[serde(default)]
    pub user_id: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::form::Form;

    #[test]
    fn parses_attendance_list_params() {
        let parsed: AttendanceListParams = Form::parse("class_id=3&limit=25").unwrap();
        assert_eq!(parsed.class_id, 3);
        assert_eq!(parsed.limit(), 25);

        let defaulted: AttendanceListParams = Form::parse("class_id=3").unwrap();
        assert_eq!(defaulted.limit(), 100);
    }

    #[test]
    fn clamps_attendance_limit() {
        let too_big: AttendanceListParams = Form::parse("class_id=1&limit=10000").unwrap();
        assert_eq!(too_big.limit(), 500);

        let too_small: AttendanceListParams = Form::parse("class_id=1&limit=0").unwrap();
        assert_eq!(too_small.limit(), 1);
    }

    #[test]
    fn class_list_teacher_defaults_to_none() {
        let parsed: ClassListParams = Form::parse("").unwrap();
        assert!(parsed.teacher_id.is_none());

        let explicit: ClassListParams = Form::parse("teacher_id=12").unwrap();
        assert_eq!(explicit.teacher_id, Some(12));
    }
}
