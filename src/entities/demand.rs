//! Demand entity - Richiesta di servizio (ticket) aperta da un cliente

use super::enums::DemandStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Demand {
    pub demand_id: i32,
    /// numero di protocollo univoco comunicato al cliente
    pub protocol: String,
    pub client_id: i32,
    pub service_id: i32,
    pub assignee_id: Option<i32>,
    pub description: String,
    pub status: DemandStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Demand {
    /// Genera un protocollo nel formato `NAFYYYYMMDD-XXXXXX`
    pub fn generate_protocol(now: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
        format!("NAF{}-{}", now.format("%Y%m%d"), suffix)
    }
}
