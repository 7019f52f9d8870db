//! Service entity - Servizio offerto dal catalogo del NAF

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Service {
    pub service_id: i32,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
