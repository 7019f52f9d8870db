//! Query DTOs - Data Transfer Objects per i query parameters

use crate::entities::{ConversationStatus, DemandStatus, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// DTO per query parameters di ricerca utenti
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub search: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ServiceListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct DemandListQuery {
    pub status: Option<DemandStatus>,
    pub service_id: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct AttendanceListQuery {
    pub demand_id: Option<i32>,
    pub attendant_id: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ConversationListQuery {
    pub status: Option<ConversationStatus>,
}

/// DTO per query parameters di polling dei messaggi
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct MessagesQuery {
    #[serde(default)]
    pub after_id: Option<i32>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ReportQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}
