//! Service DTOs - Data Transfer Objects per il catalogo servizi

use super::validation::not_blank;
use crate::entities::Service;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServiceDTO {
    pub service_id: i32,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Service> for ServiceDTO {
    fn from(value: Service) -> Self {
        Self {
            service_id: value.service_id,
            name: value.name,
            description: value.description,
            category: value.category,
            active: value.active,
            created_at: value.created_at,
        }
    }
}

/// DTO per creare un nuovo servizio (senza service_id)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateServiceDTO {
    #[validate(length(min = 1, max = 120), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(min = 1, max = 5000), custom(function = "not_blank"))]
    pub description: String,
    #[validate(length(max = 80))]
    pub category: Option<String>,
}

/// DTO per aggiornare un servizio (solo campi modificabili)
#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
pub struct UpdateServiceDTO {
    #[validate(length(min = 1, max = 120), custom(function = "not_blank"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 5000), custom(function = "not_blank"))]
    pub description: Option<String>,
    #[validate(length(max = 80))]
    pub category: Option<String>,
    pub active: Option<bool>,
}
