//! Report DTOs - Riepiloghi per coordinatori e professori

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct StatusCountsDTO {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServiceCountDTO {
    pub service_id: i32,
    pub name: String,
    pub count: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AttendantStatsDTO {
    pub user_id: i32,
    pub name: String,
    pub attendances: usize,
    pub minutes: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReportSummaryDTO {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub demands_total: usize,
    pub demands_by_status: StatusCountsDTO,
    pub demands_by_service: Vec<ServiceCountDTO>,
    pub attendances_total: usize,
    pub attendance_minutes_total: i64,
    pub attendants: Vec<AttendantStatsDTO>,
}
