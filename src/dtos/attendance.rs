//! Attendance DTOs - Data Transfer Objects per le attendance

use super::validation::not_blank;
use crate::entities::Attendance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AttendanceDTO {
    pub attendance_id: i32,
    pub demand_id: i32,
    pub attendant_id: i32,
    pub description: String,
    pub duration_minutes: i32,
    pub attended_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Attendance> for AttendanceDTO {
    fn from(value: Attendance) -> Self {
        Self {
            attendance_id: value.attendance_id,
            demand_id: value.demand_id,
            attendant_id: value.attendant_id,
            description: value.description,
            duration_minutes: value.duration_minutes,
            attended_at: value.attended_at,
            created_at: value.created_at,
        }
    }
}

/// Body di POST /api/attendances
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateAttendanceRequestDTO {
    pub demand_id: i32,
    #[validate(length(min = 1, max = 5000), custom(function = "not_blank"))]
    pub description: String,
    #[validate(range(min = 1, max = 1440, message = "Duration must be between 1 and 1440 minutes"))]
    pub duration_minutes: i32,
    pub attended_at: Option<DateTime<Utc>>,
}

/// DTO per creare una attendance nel repository
#[derive(Debug, Clone)]
pub struct CreateAttendanceDTO {
    pub demand_id: i32,
    pub attendant_id: i32,
    pub description: String,
    pub duration_minutes: i32,
    pub attended_at: DateTime<Utc>,
}
