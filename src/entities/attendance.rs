//! Attendance entity - Sessione di assistenza registrata su una demand

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Attendance {
    pub attendance_id: i32,
    pub demand_id: i32,
    pub attendant_id: i32,
    pub description: String,
    pub duration_minutes: i32,
    pub attended_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
